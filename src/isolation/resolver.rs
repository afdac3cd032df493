use std::ffi::OsStr ;
use std::path::{ Path, PathBuf };
use std::sync::Arc ;
use nonempty_collections::NEVec ;
use tracing::debug ;

use super::IsolationError ;



/// Answers whether the host already has a unit loaded, and from where.
///
/// Handed to override resolvers so they can redirect a reference to a unit some
/// other context has already loaded.
pub trait ParentLookup {
	fn loaded_location( &self, name: &str ) -> Option<PathBuf> ;
}

/// Custom resolution consulted before the search paths.
pub type OverrideResolver = Arc<dyn Fn( &str, &dyn ParentLookup ) -> Option<PathBuf> + Send + Sync> ;

/// Turns unit references into files.
///
/// A reference naming an existing file resolves to that file. Anything else goes
/// to the override resolver, if one is set, and then to every search path in
/// registration order combined with every extension in order.
#[derive( Clone )]
pub struct UnitResolver {
	search_paths: Vec<PathBuf>,
	/// Never empty.
	extensions: Vec<String>,
	override_resolver: Option<OverrideResolver>,
}

impl UnitResolver {

	pub fn new( extensions: NEVec<String> ) -> Self {
		Self { search_paths: Vec::new(), extensions: extensions.into_iter().collect(), override_resolver: None }
	}

	#[inline] pub fn search_paths( &self ) -> &[PathBuf] { &self.search_paths }
	#[inline] pub fn extensions( &self ) -> &[String] { &self.extensions }

	/// Registers search paths.
	///
	/// `paths` may hold several entries joined by the platform path separator. Every
	/// entry is made absolute; entries already registered are ignored.
	pub fn add_path( &mut self, paths: impl AsRef<OsStr> ) {
		for path in std::env::split_paths( paths.as_ref() ) {
			if path.as_os_str().is_empty() { continue }
			let path = std::path::absolute( &path ).unwrap_or( path );
			if !self.search_paths.contains( &path ) {
				debug!( path = %path.display(), "Search path registered" );
				self.search_paths.push( path );
			}
		}
	}

	pub fn set_override( &mut self, resolver: Option<OverrideResolver> ) { self.override_resolver = resolver ; }

	/// Resolves `reference` to a file.
	///
	/// # Errors
	/// Returns [`IsolationError::Unresolved`] listing every path tried.
	pub fn resolve( &self, reference: &str, parent: &dyn ParentLookup ) -> Result<PathBuf, IsolationError> {

		let direct = Path::new( reference );
		if direct.is_file() {
			return Ok( std::path::absolute( direct ).unwrap_or_else(| _ | direct.to_path_buf() ));
		}

		if let Some( resolver ) = &self.override_resolver {
			if let Some( path ) = resolver( reference, parent ) {
				debug!( reference, path = %path.display(), "Unit resolved by override" );
				return Ok( path );
			}
		}

		let has_known_extension = direct.extension()
			.and_then( OsStr::to_str )
			.is_some_and(| extension | self.extensions.iter().any(| known | known.eq_ignore_ascii_case( extension )));

		let mut searched = Vec::new();
		for folder in &self.search_paths {
			if has_known_extension {
				let candidate = folder.join( reference );
				if candidate.is_file() { return Ok( candidate ) }
				searched.push( candidate );
			}
			for extension in &self.extensions {
				let candidate = folder.join( format!( "{}.{}", reference, extension ));
				if candidate.is_file() {
					debug!( reference, path = %candidate.display(), "Unit resolved from search path" );
					return Ok( candidate );
				}
				searched.push( candidate );
			}
		}

		Err( IsolationError::Unresolved { name: reference.to_string(), searched })

	}
}

impl std::fmt::Debug for UnitResolver {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "UnitResolver" )
			.field( "search_paths", &self.search_paths )
			.field( "extensions", &self.extensions )
			.field( "override_resolver", &self.override_resolver.as_ref().map(| _ | "<closure>" ))
			.finish()
	}
}
