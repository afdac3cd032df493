use std::collections::HashMap ;
use std::sync::Arc ;
use itertools::Itertools ;

use crate::value::ValueType ;
use crate::engine::UsageError ;



/// A single operation a contract declares.
///
/// Operations are matched against candidate members by name, ignoring ASCII case,
/// and by signature: parameter types must be identical, the member's return type
/// must be assignable to [`returns`]( Self::returns ).
#[derive( Clone, Debug, PartialEq, Eq, Hash )]
pub struct Operation {
	pub name: String,
	pub params: Vec<ValueType>,
	pub returns: ValueType,
	/// Required operations must be bound for a candidate list to be compatible.
	/// Optional ones fall back to a stub returning the default value.
	pub required: bool,
}

impl Operation {

	#[inline] pub fn signature( &self ) -> Signature { Signature::new( self.params.clone(), self.returns.clone() ) }

	/// Human readable signature, e.g. `string SayHello(s32, string)`.
	pub fn signature_string( &self ) -> String {
		format!( "{} {}({})", self.returns, self.name, self.params.iter().join( ", " ))
	}
}

/// Parameter and return types of a member or an operation.
#[derive( Clone, Debug, PartialEq, Eq, Hash )]
pub struct Signature {
	pub params: Vec<ValueType>,
	pub returns: ValueType,
}

impl Signature {
	pub fn new( params: impl Into<Vec<ValueType>>, returns: ValueType ) -> Self {
		Self { params: params.into(), returns }
	}
}

impl std::fmt::Display for Signature {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		write!( f, "fn({}) -> {}", self.params.iter().join( ", " ), self.returns )
	}
}

/// A named, ordered set of operations that candidates are adapted to.
///
/// Compatibility results and generated proxy definitions are cached under the
/// contract's [`identity`]( Self::identity ), which covers every operation, so two
/// contracts sharing a name but not their operations are kept apart. Contracts are
/// immutable once built and shared behind an [`Arc`].
///
/// ```
/// use provider_link::{ Contract, ValueType };
///
/// let contract = Contract::builder( "Greeter" )
/// 	.required( "SayHello", [], ValueType::String )
/// 	.optional( "Wave", [ ValueType::U32 ], ValueType::Unit )
/// 	.build()
/// 	.unwrap();
///
/// assert_eq!( contract.operations().len(), 2 );
/// assert!( contract.operation( "sayhello" ).is_some_and(| op | op.required ));
/// assert_eq!( contract.identity(), "Greeter{string SayHello()!; unit Wave(u32)?}" );
/// ```
#[derive( Debug )]
pub struct Contract {
	name: String,
	identity: String,
	operations: Vec<Operation>,
	index: HashMap<String, usize>,
}

impl Contract {

	pub fn builder( name: impl Into<String> ) -> ContractBuilder {
		ContractBuilder { name: name.into(), operations: Vec::new() }
	}

	#[inline] pub fn name( &self ) -> &str { &self.name }
	#[inline] pub fn operations( &self ) -> &[Operation] { &self.operations }

	/// Structural identity: the name and every operation's signature, each marked
	/// `!` when required and `?` when optional, e.g. `Greeter{string SayHello()!; unit Wave(u32)?}`.
	#[inline] pub fn identity( &self ) -> &str { &self.identity }

	/// Looks an operation up by name, ignoring ASCII case.
	pub fn operation( &self, name: &str ) -> Option<&Operation> {
		self.operation_index( name ).map(| index | &self.operations[index] )
	}

	pub(crate) fn operation_index( &self, name: &str ) -> Option<usize> {
		self.index.get( &name.to_ascii_lowercase() ).copied()
	}

	pub fn required_operations( &self ) -> impl Iterator<Item = &Operation> {
		self.operations.iter().filter(| op | op.required )
	}
}

pub struct ContractBuilder {
	name: String,
	operations: Vec<Operation>,
}

impl ContractBuilder {

	pub fn required( self, name: impl Into<String>, params: impl Into<Vec<ValueType>>, returns: ValueType ) -> Self {
		self.operation( name, params, returns, true )
	}

	pub fn optional( self, name: impl Into<String>, params: impl Into<Vec<ValueType>>, returns: ValueType ) -> Self {
		self.operation( name, params, returns, false )
	}

	fn operation( mut self, name: impl Into<String>, params: impl Into<Vec<ValueType>>, returns: ValueType, required: bool ) -> Self {
		self.operations.push( Operation { name: name.into(), params: params.into(), returns, required });
		self
	}

	/// Finishes the contract.
	///
	/// # Errors
	/// Returns [`UsageError::DuplicateOperation`] if two operations share a name
	/// ignoring ASCII case. An empty contract builds fine but every engine entry
	/// point rejects it.
	pub fn build( self ) -> Result<Arc<Contract>, UsageError> {
		let mut index = HashMap::with_capacity( self.operations.len() );
		for ( position, operation ) in self.operations.iter().enumerate() {
			if index.insert( operation.name.to_ascii_lowercase(), position ).is_some() {
				return Err( UsageError::DuplicateOperation {
					contract: self.name,
					operation: operation.name.clone(),
				});
			}
		}
		let identity = format!( "{}{{{}}}", self.name, self.operations.iter()
			.map(| operation | format!( "{}{}", operation.signature_string(), match operation.required { true => '!', false => '?' }))
			.join( "; " ));
		Ok( Arc::new( Contract { name: self.name, identity, operations: self.operations, index }))
	}
}
