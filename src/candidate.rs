//! Candidates: the objects and types offered for adaptation.
//!
//! Rust has no runtime reflection, so a candidate describes its own shape with a
//! [`CandidateType`]: an optional zero-argument constructor plus an ordered list of
//! [`Surface`]s. The first surface is the type's own public surface; any further
//! surfaces are sub-contracts the type implements. Each surface lists
//! - **methods**: callable members, always present on an instance
//! - **delegates**: fields and properties holding an optional callable value, which
//! 	only binds when the value is present at adaptation time
//!
//! Shapes are registered explicitly with [`CandidateType::builder`]:
//!
//! ```
//! use std::sync::Arc ;
//! use provider_link::{ Candidate, CandidateType, ValueType };
//!
//! #[derive( Default )]
//! struct EnglishSpeaker ;
//!
//! static SHAPE: once_cell::sync::Lazy<Arc<CandidateType>> = once_cell::sync::Lazy::new(||
//! 	CandidateType::builder::<EnglishSpeaker>()
//! 		.constructor( EnglishSpeaker::default )
//! 		.method( "SayHello", [], ValueType::String, | _this, _args | Ok( "Hello".into() ))
//! 		.build()
//! );
//!
//! impl Candidate for EnglishSpeaker {
//! 	fn candidate_type( &self ) -> Arc<CandidateType> { Arc::clone( &SHAPE ) }
//! }
//!
//! assert_eq!( SHAPE.name(), "EnglishSpeaker" );
//! assert!( SHAPE.has_constructor() );
//! ```

use std::any::Any ;
use std::sync::Arc ;

use crate::value::{ Value, ValueType };
use crate::contract::{ Contract, Signature };
use crate::proxy::{ Adapter, ProxyCallError };



/// Error produced by a candidate's own code. Propagated through adapters untouched.
pub type CallError = Box<dyn std::error::Error + Send + Sync> ;
pub type CallResult = Result<Value, CallError> ;

/// A callable value held by a field or property.
pub type Delegate = Arc<dyn Fn( &[Value] ) -> CallResult + Send + Sync> ;

pub(crate) type MethodFn = Arc<dyn Fn( &dyn Candidate, &[Value] ) -> CallResult + Send + Sync> ;
pub(crate) type DelegateGetter = Arc<dyn Fn( &dyn Candidate ) -> Option<Delegate> + Send + Sync> ;
pub(crate) type Constructor = Arc<dyn Fn() -> Arc<dyn Candidate> + Send + Sync> ;

/// Wraps a closure as a [`Delegate`].
pub fn delegate( f: impl Fn( &[Value] ) -> CallResult + Send + Sync + 'static ) -> Delegate { Arc::new( f ) }

/// An object that can be adapted to a [`Contract`].
pub trait Candidate: Any + Send + Sync {

	/// The candidate's shape. Two candidates whose shapes have the same
	/// [`identity`]( CandidateType::identity ) are assumed to share the same shape.
	fn candidate_type( &self ) -> Arc<CandidateType> ;

	/// Per-operation support marker.
	///
	/// `Some( false )` withholds the operation from this candidate even if a matching
	/// member exists. `None` means the candidate has no opinion and only its
	/// structure is considered.
	fn supports_operation( &self, _operation: &str ) -> Option<bool> { None }

	/// Returns the candidate itself if it natively implements `contract`, in which
	/// case adaptation of a lone instance hands it back unchanged.
	fn native_adapter( self: Arc<Self>, _contract: &Contract ) -> Option<Arc<dyn Adapter>> { None }

}

/// Whether a delegate member is a field or a property. Fields bind before properties.
#[derive( Clone, Copy, Debug, PartialEq, Eq, Hash )]
pub enum DelegateKind { Field, Property }

pub struct MethodMember {
	pub(crate) name: String,
	pub(crate) signature: Signature,
	pub(crate) call: MethodFn,
}

impl MethodMember {
	#[inline] pub fn name( &self ) -> &str { &self.name }
	#[inline] pub fn signature( &self ) -> &Signature { &self.signature }
}

impl std::fmt::Debug for MethodMember {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "MethodMember" )
			.field( "name", &self.name )
			.field( "signature", &self.signature )
			.finish_non_exhaustive()
	}
}

pub struct DelegateMember {
	pub(crate) name: String,
	pub(crate) kind: DelegateKind,
	pub(crate) signature: Signature,
	pub(crate) getter: DelegateGetter,
}

impl DelegateMember {
	#[inline] pub fn name( &self ) -> &str { &self.name }
	#[inline] pub fn kind( &self ) -> DelegateKind { self.kind }
	#[inline] pub fn signature( &self ) -> &Signature { &self.signature }
}

impl std::fmt::Debug for DelegateMember {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "DelegateMember" )
			.field( "name", &self.name )
			.field( "kind", &self.kind )
			.field( "signature", &self.signature )
			.finish_non_exhaustive()
	}
}

/// One public surface of a candidate type.
#[derive( Debug )]
pub struct Surface {
	pub(crate) name: String,
	pub(crate) methods: Vec<MethodMember>,
	/// Fields first, then properties, each in declaration order.
	pub(crate) delegates: Vec<DelegateMember>,
}

impl Surface {
	#[inline] pub fn name( &self ) -> &str { &self.name }
	#[inline] pub fn methods( &self ) -> &[MethodMember] { &self.methods }
	#[inline] pub fn delegates( &self ) -> &[DelegateMember] { &self.delegates }
}

/// The static shape of a candidate.
pub struct CandidateType {
	name: String,
	identity: String,
	constructor: Option<Constructor>,
	surfaces: Vec<Surface>,
}

impl CandidateType {

	pub fn builder<T: Candidate>() -> CandidateTypeBuilder<T> {
		CandidateTypeBuilder {
			name: short_type_name::<T>(),
			key: None,
			constructor: None,
			own: SurfaceBuilder::new( short_type_name::<T>() ),
			implemented: Vec::new(),
		}
	}

	#[inline] pub fn name( &self ) -> &str { &self.name }

	/// Key of this shape in the engine's caches: the full path of the Rust type,
	/// followed by `@name` when the name was overridden and by `#key` for shapes
	/// generated at runtime. Types sharing a short name in different modules
	/// therefore never share cached answers.
	#[inline] pub fn identity( &self ) -> &str { &self.identity }
	#[inline] pub fn surfaces( &self ) -> &[Surface] { &self.surfaces }
	#[inline] pub fn has_constructor( &self ) -> bool { self.constructor.is_some() }

	/// Creates an instance through the zero-argument constructor, if there is one.
	pub fn instantiate( &self ) -> Option<Arc<dyn Candidate>> {
		self.constructor.as_ref().map(| constructor | constructor() )
	}

	pub fn methods( &self ) -> impl Iterator<Item = ( &Surface, &MethodMember )> {
		self.surfaces.iter().flat_map(| surface | surface.methods.iter().map( move | method | ( surface, method )))
	}

	pub fn delegates( &self ) -> impl Iterator<Item = ( &Surface, &DelegateMember )> {
		self.surfaces.iter().flat_map(| surface | surface.delegates.iter().map( move | member | ( surface, member )))
	}
}

impl std::fmt::Debug for CandidateType {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "CandidateType" )
			.field( "name", &self.name )
			.field( "identity", &self.identity )
			.field( "constructor", &self.constructor.as_ref().map(| _ | "<closure>" ))
			.field( "surfaces", &self.surfaces )
			.finish()
	}
}

fn short_type_name<T>() -> String {
	let full = std::any::type_name::<T>();
	match full.contains( '<' ) {
		true => full.to_string(),
		false => full.rsplit( "::" ).next().unwrap_or( full ).to_string(),
	}
}

/// Registers the members of one [`Surface`] for candidates of type `T`.
pub struct SurfaceBuilder<T> {
	name: String,
	methods: Vec<MethodMember>,
	fields: Vec<DelegateMember>,
	properties: Vec<DelegateMember>,
	_marker: std::marker::PhantomData<fn( &T )>,
}

impl<T: Candidate> SurfaceBuilder<T> {

	fn new( name: impl Into<String> ) -> Self {
		Self {
			name: name.into(),
			methods: Vec::new(),
			fields: Vec::new(),
			properties: Vec::new(),
			_marker: std::marker::PhantomData,
		}
	}

	pub fn method(
		mut self,
		name: impl Into<String>,
		params: impl Into<Vec<ValueType>>,
		returns: ValueType,
		call: impl Fn( &T, &[Value] ) -> CallResult + Send + Sync + 'static,
	) -> Self {
		let name = name.into();
		let member = name.clone();
		self.methods.push( MethodMember {
			name,
			signature: Signature::new( params, returns ),
			call: Arc::new( move | candidate: &dyn Candidate, args: &[Value] | {
				let receiver: &dyn Any = candidate ;
				match receiver.downcast_ref::<T>() {
					Some( this ) => call( this, args ),
					None => Err( ProxyCallError::ReceiverMismatch {
						member: member.clone(),
						expected: short_type_name::<T>(),
					}.into()),
				}
			}),
		});
		self
	}

	pub fn field(
		mut self,
		name: impl Into<String>,
		params: impl Into<Vec<ValueType>>,
		returns: ValueType,
		value: impl Fn( &T ) -> Option<Delegate> + Send + Sync + 'static,
	) -> Self {
		let member = Self::delegate_member( name.into(), DelegateKind::Field, Signature::new( params, returns ), value );
		self.fields.push( member );
		self
	}

	pub fn property(
		mut self,
		name: impl Into<String>,
		params: impl Into<Vec<ValueType>>,
		returns: ValueType,
		value: impl Fn( &T ) -> Option<Delegate> + Send + Sync + 'static,
	) -> Self {
		let member = Self::delegate_member( name.into(), DelegateKind::Property, Signature::new( params, returns ), value );
		self.properties.push( member );
		self
	}

	fn delegate_member(
		name: String,
		kind: DelegateKind,
		signature: Signature,
		value: impl Fn( &T ) -> Option<Delegate> + Send + Sync + 'static,
	) -> DelegateMember {
		DelegateMember {
			name,
			kind,
			signature,
			getter: Arc::new( move | candidate: &dyn Candidate | {
				let receiver: &dyn Any = candidate ;
				receiver.downcast_ref::<T>().and_then(&value )
			}),
		}
	}

	fn build( mut self ) -> Surface {
		self.fields.append( &mut self.properties );
		Surface { name: self.name, methods: self.methods, delegates: self.fields }
	}
}

pub struct CandidateTypeBuilder<T> {
	name: String,
	key: Option<String>,
	constructor: Option<Constructor>,
	own: SurfaceBuilder<T>,
	implemented: Vec<Surface>,
}

impl<T: Candidate> CandidateTypeBuilder<T> {

	/// Overrides the type name, which defaults to the Rust type's own name.
	pub fn named( mut self, name: impl Into<String> ) -> Self {
		self.name = name.into();
		self.own.name.clone_from( &self.name );
		self
	}

	/// Distinguishes shapes generated at runtime for the same Rust type and name.
	pub(crate) fn keyed( mut self, key: impl Into<String> ) -> Self {
		self.key = Some( key.into() );
		self
	}

	pub fn constructor( mut self, constructor: impl Fn() -> T + Send + Sync + 'static ) -> Self {
		self.constructor = Some( Arc::new( move || Arc::new( constructor()) as Arc<dyn Candidate> ));
		self
	}

	pub fn method(
		mut self,
		name: impl Into<String>,
		params: impl Into<Vec<ValueType>>,
		returns: ValueType,
		call: impl Fn( &T, &[Value] ) -> CallResult + Send + Sync + 'static,
	) -> Self {
		self.own = self.own.method( name, params, returns, call );
		self
	}

	pub fn field(
		mut self,
		name: impl Into<String>,
		params: impl Into<Vec<ValueType>>,
		returns: ValueType,
		value: impl Fn( &T ) -> Option<Delegate> + Send + Sync + 'static,
	) -> Self {
		self.own = self.own.field( name, params, returns, value );
		self
	}

	pub fn property(
		mut self,
		name: impl Into<String>,
		params: impl Into<Vec<ValueType>>,
		returns: ValueType,
		value: impl Fn( &T ) -> Option<Delegate> + Send + Sync + 'static,
	) -> Self {
		self.own = self.own.property( name, params, returns, value );
		self
	}

	/// Adds a public sub-contract surface. Its members are searched after the
	/// type's own, in the order surfaces were added.
	pub fn implements(
		mut self,
		name: impl Into<String>,
		configure: impl FnOnce( SurfaceBuilder<T> ) -> SurfaceBuilder<T>,
	) -> Self {
		self.implemented.push( configure( SurfaceBuilder::new( name )).build() );
		self
	}

	pub fn build( self ) -> Arc<CandidateType> {
		let mut surfaces = Vec::with_capacity( 1 + self.implemented.len() );
		surfaces.push( self.own.build() );
		surfaces.extend( self.implemented );
		let mut identity = std::any::type_name::<T>().to_string();
		if self.name != short_type_name::<T>() { identity = format!( "{}@{}", identity, self.name ); }
		if let Some( key ) = &self.key { identity = format!( "{}#{}", identity, key ); }
		Arc::new( CandidateType { name: self.name, identity, constructor: self.constructor, surfaces })
	}
}

/// An entry of the candidate list handed to the engine.
#[derive( Clone )]
pub enum CandidateRef {
	/// A type, instantiated through its constructor when an adapter is created.
	Type( Arc<CandidateType> ),
	Instance( Arc<dyn Candidate> ),
}

impl CandidateRef {

	pub fn instance( candidate: impl Candidate ) -> Self { Self::Instance( Arc::new( candidate )) }

	pub fn candidate_type( &self ) -> Arc<CandidateType> {
		match self {
			Self::Type( ty ) => Arc::clone( ty ),
			Self::Instance( instance ) => instance.candidate_type(),
		}
	}
}

impl std::fmt::Debug for CandidateRef {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		match self {
			Self::Type( ty ) => f.debug_tuple( "Type" ).field( &ty.name() ).finish(),
			Self::Instance( instance ) => f.debug_tuple( "Instance" ).field( &instance.candidate_type().name() ).finish(),
		}
	}
}

impl From<Arc<CandidateType>> for CandidateRef {
	fn from( ty: Arc<CandidateType> ) -> Self { Self::Type( ty ) }
}

impl From<Arc<dyn Candidate>> for CandidateRef {
	fn from( instance: Arc<dyn Candidate> ) -> Self { Self::Instance( instance ) }
}
