use std::path::{ Path, PathBuf };
use std::sync::{ Arc, PoisonError };
use wasmtime::component::Val ;

use crate::candidate::{ Candidate, CandidateType };
use crate::value::{ Value, ValueType };
use super::{ IsolationError, LoadStrategy };
use super::context::ContextShared ;



/// Handle to a unit loaded into an [`IsolationContext`]( super::IsolationContext ).
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct LoadedUnit {
	pub(crate) context: usize,
	pub(crate) index: usize,
	/// Unique per load in the process; keys the unit's candidate shapes.
	pub(crate) serial: usize,
	pub(crate) name: String,
	pub(crate) location: PathBuf,
	pub(crate) loaded_from: PathBuf,
	pub(crate) strategy: LoadStrategy,
	pub(crate) symbols: Option<PathBuf>,
}

impl LoadedUnit {
	/// The unit's name, its file stem.
	#[inline] pub fn name( &self ) -> &str { &self.name }
	/// The resolved file.
	#[inline] pub fn location( &self ) -> &Path { &self.location }
	/// The file actually loaded; the shadow copy for [`LoadStrategy::ShadowCopy`].
	#[inline] pub fn loaded_from( &self ) -> &Path { &self.loaded_from }
	#[inline] pub fn strategy( &self ) -> LoadStrategy { self.strategy }
	/// Sibling symbols file recorded by [`LoadStrategy::Bytes`].
	#[inline] pub fn symbols( &self ) -> Option<&Path> { self.symbols.as_deref() }
}

/// An object living inside an isolation context, exposed as a [`Candidate`].
///
/// Its shape lists the contract operations the unit exports. Every call crosses
/// into the context's store; once the context is unloaded, calls fail with
/// [`IsolationError::Unloaded`].
pub struct IsolatedCandidate {
	pub(crate) shared: Arc<ContextShared>,
	pub(crate) unit: usize,
	pub(crate) interface: Option<String>,
	pub(crate) shape: Arc<CandidateType>,
}

impl IsolatedCandidate {

	const PLACEHOLDER_VAL: Val = Val::Tuple( vec![] );

	pub(crate) fn call( &self, export: &str, returns: &ValueType, args: &[Value] ) -> Result<Value, IsolationError> {

		let data = args.iter().map( to_val ).collect::<Result<Vec<_>, _>>()?;
		let mut buffer = match *returns != ValueType::Unit {
			true => vec![ Self::PLACEHOLDER_VAL ],
			false => Vec::with_capacity( 0 ),
		};

		let mut state = self.shared.state.lock().unwrap_or_else( PoisonError::into_inner );
		let ( store, instance ) = state.instance_of( self.unit )
			.ok_or_else(|| IsolationError::Unloaded { context: self.shared.name.clone() })?;

		let interface_index = match &self.interface {
			Some( path ) => Some( instance
				.get_export_index( &mut *store, None, path )
				.ok_or_else(|| self.missing( path ))? ),
			None => None,
		};
		let func_index = instance
			.get_export_index( &mut *store, interface_index.as_ref(), export )
			.ok_or_else(|| self.missing( export ))?;
		let func = instance
			.get_func( &mut *store, func_index )
			.ok_or_else(|| self.missing( export ))?;

		func.call( &mut *store, &data, &mut buffer ).map_err( IsolationError::Runtime )?;
		let _ = func.post_return( &mut *store );

		match *returns != ValueType::Unit {
			true => from_val( buffer.pop().ok_or( IsolationError::MissingResult )? ),
			false => Ok( Value::Unit ),
		}

	}

	fn missing( &self, export: &str ) -> IsolationError {
		IsolationError::MissingExport { unit: self.shape.name().to_string(), export: export.to_string() }
	}
}

impl Candidate for IsolatedCandidate {
	fn candidate_type( &self ) -> Arc<CandidateType> { Arc::clone( &self.shape ) }
}

impl std::fmt::Debug for IsolatedCandidate {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "IsolatedCandidate" )
			.field( "context", &self.shared.name )
			.field( "unit", &self.unit )
			.field( "interface", &self.interface )
			.field( "shape", &self.shape.name() )
			.finish()
	}
}

/// Export name variants tried for an operation: verbatim, then kebab-case.
pub(crate) fn export_names( operation: &str ) -> Vec<String> {
	let mut kebab = String::with_capacity( operation.len() + 4 );
	for ( position, character ) in operation.char_indices() {
		match character {
			'_' => kebab.push( '-' ),
			upper if upper.is_ascii_uppercase() => {
				if position > 0 && !kebab.ends_with( '-' ) { kebab.push( '-' ); }
				kebab.push( upper.to_ascii_lowercase() );
			}
			other => kebab.push( other ),
		}
	}
	match kebab == operation {
		true => vec![ kebab ],
		false => vec![ operation.to_string(), kebab ],
	}
}

fn to_val( value: &Value ) -> Result<Val, IsolationError> {
	Ok( match value {
		Value::Bool( value ) => Val::Bool( *value ),
		Value::S32( value ) => Val::S32( *value ),
		Value::S64( value ) => Val::S64( *value ),
		Value::U32( value ) => Val::U32( *value ),
		Value::U64( value ) => Val::U64( *value ),
		Value::F64( value ) => Val::Float64( *value ),
		Value::String( value ) => Val::String( value.clone() ),
		Value::List( items ) => Val::List( items.iter().map( to_val ).collect::<Result<_, _>>()? ),
		Value::Unit | Value::Null | Value::Object( _ ) => return Err( IsolationError::UnsupportedValue( value.kind() )),
	})
}

fn from_val( val: Val ) -> Result<Value, IsolationError> {
	Ok( match val {
		Val::Bool( value ) => Value::Bool( value ),
		Val::S8( value ) => Value::S32( value.into() ),
		Val::S16( value ) => Value::S32( value.into() ),
		Val::S32( value ) => Value::S32( value ),
		Val::S64( value ) => Value::S64( value ),
		Val::U8( value ) => Value::U32( value.into() ),
		Val::U16( value ) => Value::U32( value.into() ),
		Val::U32( value ) => Value::U32( value ),
		Val::U64( value ) => Value::U64( value ),
		Val::Float32( value ) => Value::F64( value.into() ),
		Val::Float64( value ) => Value::F64( value ),
		Val::Char( value ) => Value::String( value.to_string() ),
		Val::String( value ) => Value::String( value ),
		Val::List( items ) => Value::List( items.into_iter().map( from_val ).collect::<Result<_, _>>()? ),
		Val::Option( None ) => Value::Null,
		Val::Option( Some( inner )) => from_val( *inner )?,
		Val::Tuple( items ) if items.is_empty() => Value::Unit,
		other => return Err( IsolationError::UnsupportedType( format!( "{:?}", other ))),
	})
}
