//! Dynamic value model used for operation signatures and call arguments.
//!
//! Operations are described by [`ValueType`]s and invoked with [`Value`]s. This
//! replaces runtime reflection: every parameter and return type that can cross an
//! adapter is one of a small, closed set of shapes.

use std::sync::Arc ;
use thiserror::Error ;

use crate::candidate::Candidate ;



/// The declared type of an operation parameter or return value.
#[derive( Clone, Debug, PartialEq, Eq, Hash )]
pub enum ValueType {
	/// No value. Only meaningful as a return type.
	Unit,
	Bool,
	S32,
	S64,
	U32,
	U64,
	F64,
	String,
	/// Homogeneous list of the inner type.
	List( Box<ValueType> ),
	/// A callback object, passed as a [`Candidate`].
	Object,
	/// Any value at all. Accepts every non-unit type.
	Any,
}

impl ValueType {

	/// Shorthand for `ValueType::List( Box::new( inner ))`.
	pub fn list( inner: ValueType ) -> Self { Self::List( Box::new( inner )) }

	/// Whether values of this type are references (their default is [`Value::Null`]).
	pub fn is_reference( &self ) -> bool {
		matches!( self, Self::String | Self::List( _ ) | Self::Object | Self::Any )
	}

	/// The value a stubbed operation returns for this type.
	///
	/// Numbers are zero, `Bool` is `false`, reference types are [`Value::Null`].
	/// A `String` stub returns `Null`, never an empty string.
	pub fn default_value( &self ) -> Value {
		match self {
			Self::Unit => Value::Unit,
			Self::Bool => Value::Bool( false ),
			Self::S32 => Value::S32( 0 ),
			Self::S64 => Value::S64( 0 ),
			Self::U32 => Value::U32( 0 ),
			Self::U64 => Value::U64( 0 ),
			Self::F64 => Value::F64( 0.0 ),
			Self::String | Self::List( _ ) | Self::Object | Self::Any => Value::Null,
		}
	}

	/// Whether a member returning `other` can stand in for an operation returning `self`.
	pub fn accepts( &self, other: &ValueType ) -> bool {
		match ( self, other ) {
			( a, b ) if a == b => true,
			( Self::Any, other ) => *other != Self::Unit,
			( Self::List( a ), Self::List( b )) => a.accepts( b ),
			_ => false,
		}
	}

	/// Whether `value` is a valid argument for a parameter of this type.
	pub fn admits( &self, value: &Value ) -> bool {
		match ( self, value ) {
			( Self::Any, Value::Unit ) => false,
			( Self::Any, _ ) => true,
			( ty, Value::Null ) => ty.is_reference(),
			( Self::Unit, Value::Unit )
			| ( Self::Bool, Value::Bool( _ ))
			| ( Self::S32, Value::S32( _ ))
			| ( Self::S64, Value::S64( _ ))
			| ( Self::U32, Value::U32( _ ))
			| ( Self::U64, Value::U64( _ ))
			| ( Self::F64, Value::F64( _ ))
			| ( Self::String, Value::String( _ ))
			| ( Self::Object, Value::Object( _ )) => true,
			( Self::List( inner ), Value::List( items )) => items.iter().all(| item | inner.admits( item )),
			_ => false,
		}
	}
}

impl std::fmt::Display for ValueType {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		match self {
			Self::Unit => write!( f, "unit" ),
			Self::Bool => write!( f, "bool" ),
			Self::S32 => write!( f, "s32" ),
			Self::S64 => write!( f, "s64" ),
			Self::U32 => write!( f, "u32" ),
			Self::U64 => write!( f, "u64" ),
			Self::F64 => write!( f, "f64" ),
			Self::String => write!( f, "string" ),
			Self::List( inner ) => write!( f, "list<{}>", inner ),
			Self::Object => write!( f, "object" ),
			Self::Any => write!( f, "any" ),
		}
	}
}

/// A runtime value passed to or returned from an operation.
#[derive( Clone )]
pub enum Value {
	Unit,
	/// Absent reference; the default of `String`, `List`, `Object` and `Any`.
	Null,
	Bool( bool ),
	S32( i32 ),
	S64( i64 ),
	U32( u32 ),
	U64( u64 ),
	F64( f64 ),
	String( String ),
	List( Vec<Value> ),
	/// A callback object the receiving side may adapt to a contract of its own.
	Object( Arc<dyn Candidate> ),
}

impl Value {

	/// Short name of the value's shape, used in diagnostics.
	pub fn kind( &self ) -> &'static str {
		match self {
			Self::Unit => "unit",
			Self::Null => "null",
			Self::Bool( _ ) => "bool",
			Self::S32( _ ) => "s32",
			Self::S64( _ ) => "s64",
			Self::U32( _ ) => "u32",
			Self::U64( _ ) => "u64",
			Self::F64( _ ) => "f64",
			Self::String( _ ) => "string",
			Self::List( _ ) => "list",
			Self::Object( _ ) => "object",
		}
	}

	#[inline] pub fn is_null( &self ) -> bool { matches!( self, Self::Null ) }

	/// Borrows the string payload, if any.
	pub fn as_str( &self ) -> Option<&str> {
		match self {
			Self::String( value ) => Some( value ),
			_ => None,
		}
	}
}

impl std::fmt::Debug for Value {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		match self {
			Self::Unit => write!( f, "Unit" ),
			Self::Null => write!( f, "Null" ),
			Self::Bool( value ) => f.debug_tuple( "Bool" ).field( value ).finish(),
			Self::S32( value ) => f.debug_tuple( "S32" ).field( value ).finish(),
			Self::S64( value ) => f.debug_tuple( "S64" ).field( value ).finish(),
			Self::U32( value ) => f.debug_tuple( "U32" ).field( value ).finish(),
			Self::U64( value ) => f.debug_tuple( "U64" ).field( value ).finish(),
			Self::F64( value ) => f.debug_tuple( "F64" ).field( value ).finish(),
			Self::String( value ) => f.debug_tuple( "String" ).field( value ).finish(),
			Self::List( items ) => f.debug_tuple( "List" ).field( items ).finish(),
			Self::Object( object ) => f.debug_tuple( "Object" )
				.field( &object.candidate_type().name() )
				.finish(),
		}
	}
}

impl PartialEq for Value {
	fn eq( &self, other: &Self ) -> bool {
		match ( self, other ) {
			( Self::Unit, Self::Unit ) | ( Self::Null, Self::Null ) => true,
			( Self::Bool( a ), Self::Bool( b )) => a == b,
			( Self::S32( a ), Self::S32( b )) => a == b,
			( Self::S64( a ), Self::S64( b )) => a == b,
			( Self::U32( a ), Self::U32( b )) => a == b,
			( Self::U64( a ), Self::U64( b )) => a == b,
			( Self::F64( a ), Self::F64( b )) => a == b,
			( Self::String( a ), Self::String( b )) => a == b,
			( Self::List( a ), Self::List( b )) => a == b,
			( Self::Object( a ), Self::Object( b )) => std::ptr::addr_eq( Arc::as_ptr( a ), Arc::as_ptr( b )),
			_ => false,
		}
	}
}

impl From<()> for Value { fn from( (): () ) -> Self { Self::Unit }}
impl From<bool> for Value { fn from( value: bool ) -> Self { Self::Bool( value )}}
impl From<i32> for Value { fn from( value: i32 ) -> Self { Self::S32( value )}}
impl From<i64> for Value { fn from( value: i64 ) -> Self { Self::S64( value )}}
impl From<u32> for Value { fn from( value: u32 ) -> Self { Self::U32( value )}}
impl From<u64> for Value { fn from( value: u64 ) -> Self { Self::U64( value )}}
impl From<f64> for Value { fn from( value: f64 ) -> Self { Self::F64( value )}}
impl From<String> for Value { fn from( value: String ) -> Self { Self::String( value )}}
impl From<&str> for Value { fn from( value: &str ) -> Self { Self::String( value.to_string() )}}
impl From<Arc<dyn Candidate>> for Value { fn from( value: Arc<dyn Candidate> ) -> Self { Self::Object( value )}}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from( items: Vec<T> ) -> Self { Self::List( items.into_iter().map( Into::into ).collect() )}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from( value: Option<T> ) -> Self { value.map_or( Self::Null, Into::into )}
}

/// A [`Value`] did not have the shape a typed conversion expected.
#[derive( Debug, Error )]
#[error( "Expected {expected}, found {found}" )]
pub struct ConversionError {
	pub expected: &'static str,
	pub found: &'static str,
}

macro_rules! try_from_value {
	( $( $ty:ty => $variant:ident, $name:literal );* $(;)? ) => { $(
		impl TryFrom<Value> for $ty {
			type Error = ConversionError ;
			fn try_from( value: Value ) -> Result<Self, Self::Error> {
				match value {
					Value::$variant( inner ) => Ok( inner ),
					other => Err( ConversionError { expected: $name, found: other.kind() }),
				}
			}
		}
	)* };
}

try_from_value! {
	bool => Bool, "bool" ;
	i32 => S32, "s32" ;
	i64 => S64, "s64" ;
	u32 => U32, "u32" ;
	u64 => U64, "u64" ;
	f64 => F64, "f64" ;
	String => String, "string" ;
	Vec<Value> => List, "list" ;
}

impl TryFrom<Value> for () {
	type Error = ConversionError ;
	fn try_from( value: Value ) -> Result<Self, Self::Error> {
		match value {
			Value::Unit => Ok(()),
			other => Err( ConversionError { expected: "unit", found: other.kind() }),
		}
	}
}

impl TryFrom<Value> for Option<String> {
	type Error = ConversionError ;
	fn try_from( value: Value ) -> Result<Self, Self::Error> {
		match value {
			Value::Null => Ok( None ),
			Value::String( inner ) => Ok( Some( inner )),
			other => Err( ConversionError { expected: "string or null", found: other.kind() }),
		}
	}
}
