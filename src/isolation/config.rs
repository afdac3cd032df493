use std::path::{ Path, PathBuf };
use serde::Deserialize ;
use thiserror::Error ;



/// How a unit's file is turned into a loaded component.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize )]
#[serde( rename_all = "kebab-case" )]
pub enum LoadStrategy {
	/// Load from the resolved file and keep it open until the context is unloaded.
	Locked,
	/// Copy the file into the context's shadow directory and load the copy,
	/// leaving the original free to be replaced. Copies are removed on unload.
	ShadowCopy,
	/// Read the raw bytes and release the file immediately. A `.dwp` symbols file
	/// next to the unit is recorded if present.
	#[default]
	Bytes,
}

/// Errors that can occur when reading an [`IsolationConfig`].
#[derive( Error, Debug )]
pub enum ConfigError {
	#[error( "IO Error: {0}" )] Io( #[from] std::io::Error ),
	#[error( "TOML Error: {0}" )] Toml( #[from] toml::de::Error ),
	/// At least one unit file extension is needed to resolve references by name.
	#[error( "No unit file extensions configured" )] NoExtensions,
}

/// Settings of one isolation context.
///
/// Usually built in code with the `with_*` methods, or read from TOML:
///
/// ```
/// use provider_link::isolation::{ IsolationConfig, LoadStrategy };
///
/// let config = IsolationConfig::from_toml_str( r#"
/// 	name = "providers"
/// 	search_paths = [ "/opt/providers" ]
/// 	strategy = "shadow-copy"
/// 	include_host_paths = false
/// "# ).unwrap();
///
/// assert_eq!( config.name, "providers" );
/// assert_eq!( config.strategy, LoadStrategy::ShadowCopy );
/// assert_eq!( config.extensions, [ "wasm", "wat" ]);
/// ```
#[derive( Debug, Clone, PartialEq, Eq, Deserialize )]
#[serde( deny_unknown_fields )]
pub struct IsolationConfig {
	#[serde( default = "default_name" )]
	pub name: String,
	/// Directories searched for units referenced by name, in order.
	#[serde( default )]
	pub search_paths: Vec<PathBuf>,
	/// Unit file extensions tried for every search path, in order.
	#[serde( default = "default_extensions" )]
	pub extensions: Vec<String>,
	#[serde( default )]
	pub strategy: LoadStrategy,
	/// Whether the directory of the hosting binary is searched first.
	#[serde( default = "default_true" )]
	pub include_host_paths: bool,
	/// Where shadow copies go. A fresh directory under the system temp dir if unset.
	#[serde( default )]
	pub shadow_directory: Option<PathBuf>,
}

fn default_name() -> String { "isolated".to_string() }
fn default_extensions() -> Vec<String> { vec![ "wasm".to_string(), "wat".to_string() ]}
fn default_true() -> bool { true }

impl Default for IsolationConfig {
	fn default() -> Self {
		Self {
			name: default_name(),
			search_paths: Vec::new(),
			extensions: default_extensions(),
			strategy: LoadStrategy::default(),
			include_host_paths: true,
			shadow_directory: None,
		}
	}
}

impl IsolationConfig {

	pub fn new( name: impl Into<String> ) -> Self { Self { name: name.into(), ..Self::default() }}

	pub fn with_search_path( mut self, path: impl Into<PathBuf> ) -> Self {
		self.search_paths.push( path.into() );
		self
	}

	pub fn with_extensions( mut self, extensions: impl IntoIterator<Item = impl Into<String>> ) -> Self {
		self.extensions = extensions.into_iter().map( Into::into ).collect();
		self
	}

	pub fn with_strategy( mut self, strategy: LoadStrategy ) -> Self {
		self.strategy = strategy ;
		self
	}

	pub fn with_host_paths( mut self, include: bool ) -> Self {
		self.include_host_paths = include ;
		self
	}

	pub fn with_shadow_directory( mut self, path: impl Into<PathBuf> ) -> Self {
		self.shadow_directory = Some( path.into() );
		self
	}

	/// Parses and validates a TOML configuration.
	///
	/// # Errors
	/// Fails on malformed TOML, unknown keys, or an empty extension list.
	pub fn from_toml_str( source: &str ) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str( source )?;
		config.validate()?;
		Ok( config )
	}

	/// Reads and validates a TOML configuration file.
	///
	/// # Errors
	/// Fails if the file cannot be read, or as [`from_toml_str`]( Self::from_toml_str ).
	pub fn from_file( path: impl AsRef<Path> ) -> Result<Self, ConfigError> {
		Self::from_toml_str( &std::fs::read_to_string( path )? )
	}

	pub(crate) fn validate( &self ) -> Result<(), ConfigError> {
		match self.extensions.is_empty() {
			true => Err( ConfigError::NoExtensions ),
			false => Ok(()),
		}
	}
}
