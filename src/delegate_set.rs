use std::sync::Arc ;
use itertools::Itertools ;

use crate::candidate::{ Candidate, CandidateType, Delegate };
use crate::value::ValueType ;



/// An anonymous candidate made only of named delegates.
///
/// Useful for ad-hoc providers that implement a handful of operations as closures.
/// Each entry becomes a field; an entry whose delegate is `None` is present but
/// never binds. The set has no constructor, so it can only be offered as an instance.
///
/// ```
/// use provider_link::{ AdaptationEngine, CandidateRef, Contract, DelegateSet, Value, ValueType, delegate };
///
/// let contract = Contract::builder( "Counter" )
/// 	.required( "Next", [], ValueType::U32 )
/// 	.build()
/// 	.unwrap();
///
/// let set = DelegateSet::builder()
/// 	.with( "next", [], ValueType::U32, delegate(| _ | Ok( Value::U32( 7 ))))
/// 	.build();
///
/// let engine = AdaptationEngine::new();
/// let adapter = engine.create_adapter( &contract, &[ CandidateRef::instance( set )]).unwrap();
/// assert_eq!( adapter.invoke( "Next", &[] ).unwrap(), Value::U32( 7 ));
/// ```
pub struct DelegateSet {
	shape: Arc<CandidateType>,
	delegates: Vec<Option<Delegate>>,
}

impl DelegateSet {
	pub fn builder() -> DelegateSetBuilder { DelegateSetBuilder { entries: Vec::new() }}
}

impl Candidate for DelegateSet {
	fn candidate_type( &self ) -> Arc<CandidateType> { Arc::clone( &self.shape ) }
}

impl std::fmt::Debug for DelegateSet {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "DelegateSet" )
			.field( "shape", &self.shape.name() )
			.field( "present", &self.delegates.iter().map( Option::is_some ).collect::<Vec<_>>() )
			.finish()
	}
}

struct Entry {
	name: String,
	params: Vec<ValueType>,
	returns: ValueType,
	delegate: Option<Delegate>,
}

pub struct DelegateSetBuilder {
	entries: Vec<Entry>,
}

impl DelegateSetBuilder {

	pub fn with(
		self,
		name: impl Into<String>,
		params: impl Into<Vec<ValueType>>,
		returns: ValueType,
		delegate: Delegate,
	) -> Self {
		self.maybe( name, params, returns, Some( delegate ))
	}

	/// Adds an entry whose delegate may be absent.
	pub fn maybe(
		mut self,
		name: impl Into<String>,
		params: impl Into<Vec<ValueType>>,
		returns: ValueType,
		delegate: Option<Delegate>,
	) -> Self {
		self.entries.push( Entry { name: name.into(), params: params.into(), returns, delegate });
		self
	}

	pub fn build( self ) -> DelegateSet {

		// Anonymous sets are identified by their member signatures, so two sets
		// declaring the same members share cached results and proxy shapes.
		let name = format!( "{{{}}}", self.entries.iter()
			.map(| entry | format!( "{}: fn({}) -> {}", entry.name, entry.params.iter().join( ", " ), entry.returns ))
			.join( ", " ));

		let mut delegates = Vec::with_capacity( self.entries.len() );
		let shape = self.entries.into_iter()
			.enumerate()
			.fold( CandidateType::builder::<DelegateSet>().named( name ), | builder, ( index, entry )| {
				delegates.push( entry.delegate );
				builder.field( entry.name, entry.params, entry.returns, move | this: &DelegateSet | {
					this.delegates.get( index ).cloned().flatten()
				})
			})
			.build();

		DelegateSet { shape, delegates }

	}
}
