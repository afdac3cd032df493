//! Loading providers into isolated, unloadable contexts.
//!
//! An [`IsolationHost`] creates [`IsolationContext`]s. Each context owns its own
//! wasmtime store and linker, resolves unit references through its own
//! [`UnitResolver`], and loads units (WebAssembly components) with a
//! [`LoadStrategy`]. Objects inside a context are adapted to host contracts through
//! the same [`AdaptationEngine`]( crate::AdaptationEngine ) as local candidates:
//!
//! ```
//! use std::sync::Arc ;
//! use provider_link::{ AdaptationEngine, Contract, Value, ValueType };
//! use provider_link::isolation::{ IsolationConfig, IsolationHost };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! std::fs::write( dir.path().join( "answer.wat" ), r#"(component
//! 	(core module $m (func (export "f") (result i32) i32.const 42))
//! 	(core instance $i (instantiate $m))
//! 	(func $f (result u32) (canon lift (core func $i "f")))
//! 	(instance $inst (export "get-answer" (func $f)))
//! 	(export "demo:answer/api" (instance $inst))
//! )"# )?;
//!
//! let host = IsolationHost::new( Arc::new( AdaptationEngine::new() ));
//! let context = host.create_context( &IsolationConfig::new( "demo" )
//! 	.with_host_paths( false )
//! 	.with_search_path( dir.path() ))?;
//!
//! let unit = context.load( "answer", None )?;
//! let contract = Contract::builder( "Answer" ).required( "GetAnswer", [], ValueType::U32 ).build()?;
//! let adapter = context.adapt( &unit, Some( "demo:answer/api" ), &contract )?;
//! assert_eq!( adapter.invoke( "GetAnswer", &[] ).unwrap(), Value::U32( 42 ));
//!
//! context.unload();
//! assert!( adapter.invoke( "GetAnswer", &[] ).is_err() );
//! # Ok(())
//! # }
//! ```
//!
//! After [`IsolationContext::unload`] every adapter wrapping an object of that
//! context fails with [`IsolationError::Unloaded`].

use std::path::PathBuf ;
use thiserror::Error ;

use crate::engine::AdaptError ;

mod config ;
mod resolver ;
mod context ;
mod unit ;

pub use config::{ IsolationConfig, LoadStrategy, ConfigError };
pub use resolver::{ UnitResolver, ParentLookup, OverrideResolver };
pub use context::{ IsolationHost, IsolationContext, Phase };
pub use unit::{ LoadedUnit, IsolatedCandidate };



/// Errors raised while resolving, loading, or calling into isolated units.
#[derive( Error, Debug )]
pub enum IsolationError {
	/// No file was found for a unit reference.
	#[error( "Unit '{name}' could not be resolved, searched: {searched:?}" )]
	Unresolved { name: String, searched: Vec<PathBuf> },
	#[error( "IO Error on '{}': {source}", .path.display() )]
	Io { path: PathBuf, source: std::io::Error },
	/// The unit is not a valid component.
	#[error( "Compile Error: {0}" )] Compile( wasmtime::Error ),
	#[error( "Instantiate Error: {0}" )] Instantiate( wasmtime::Error ),
	/// The context was unloaded. Every later call through its objects fails this way.
	#[error( "Isolation context '{context}' has been unloaded" )]
	Unloaded { context: String },
	#[error( "Unit '{unit}' was not loaded by isolation context '{context}'" )]
	ForeignUnit { unit: String, context: String },
	#[error( "Unit '{unit}' has no export '{export}'" )]
	MissingExport { unit: String, export: String },
	/// The component trapped or otherwise failed while running.
	#[error( "Runtime Exception: {0}" )] Runtime( wasmtime::Error ),
	/// A value that cannot cross the isolation boundary.
	#[error( "Unsupported value: {0}" )] UnsupportedValue( &'static str ),
	/// A component value with no counterpart in the value model.
	#[error( "Unsupported type: {0}" )] UnsupportedType( String ),
	#[error( "Missing Result" )] MissingResult,
	#[error( "Configuration Error: {0}" )] Config( #[from] ConfigError ),
	#[error( "{0}" )] Adapt( #[from] AdaptError ),
}

impl IsolationError {
	pub(crate) fn io( path: impl Into<PathBuf> ) -> impl FnOnce( std::io::Error ) -> Self {
		let path = path.into();
		move | source | Self::Io { path, source }
	}
}
