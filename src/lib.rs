//! Runtime contract adaptation for duck-typed plugins.
//!
//! A host wants to treat heterogeneous "provider" plugins as implementations of one
//! uniform contract, although each provider implements it only partially, with a
//! different subset of operations, or informally. `provider_link` decides at runtime
//! whether a set of candidates satisfies enough of a contract to be usable and, if
//! so, synthesizes a proxy that implements the whole contract.
//!
//! # Core Concepts
//!
//! - [`Contract`]: A named, ordered set of [`Operation`]s, each with parameter types,
//! 	a return type and a required/optional flag. Contracts are immutable and shared
//! 	behind an [`Arc`]( std::sync::Arc ).
//!
//! - [`Candidate`]: An object offered for adaptation. Its shape is described by a
//! 	[`CandidateType`] registered with [`CandidateType::builder`]: an optional
//! 	zero-argument constructor, method members, and delegate members (fields and
//! 	properties holding an optional callable). A candidate may also carry a support
//! 	marker that withholds operations it structurally has.
//!
//! - [`AdaptationEngine`]: Inspects candidates against contracts, caches the answers,
//! 	and builds adapters. Every operation is bound to the first matching member, in
//! 	caller order, or stubbed if it is optional and nothing implements it.
//!
//! - [`Adapter`]: The result of adaptation. Operations are invoked by name with
//! 	dynamic [`Value`]s; [`AdapterExt::call`] converts the result to a Rust type.
//!
//! - [`isolation`]: Loads providers as WebAssembly components into isolated,
//! 	unloadable contexts and adapts them through the same engine.
//!
//! # Matching
//!
//! An operation matches a member when their names are equal ignoring ASCII case,
//! their parameter types are identical, and the member's return type is assignable
//! to the operation's. Methods of all of a candidate's surfaces are tried before its
//! delegate members, and a delegate member only matches while it holds a value.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc ;
//! use once_cell::sync::Lazy ;
//! use provider_link::{
//! 	AdaptationEngine, Adapter, AdapterExt, Candidate, CandidateRef, CandidateType, Contract, Value, ValueType,
//! };
//!
//! // Providers describe their shape once. Here a speaker that knows only how to greet.
//! #[derive( Default )]
//! struct EnglishSpeaker ;
//!
//! static ENGLISH_SPEAKER: Lazy<Arc<CandidateType>> = Lazy::new(|| CandidateType::builder::<EnglishSpeaker>()
//! 	.constructor( EnglishSpeaker::default )
//! 	.method( "sayHello", [], ValueType::String, | _this, _args | Ok( "Hello".into() ))
//! 	.build()
//! );
//!
//! impl Candidate for EnglishSpeaker {
//! 	fn candidate_type( &self ) -> Arc<CandidateType> { Arc::clone( &ENGLISH_SPEAKER ) }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // The host declares what it needs. Only `SayHello` is mandatory.
//! let greeter = Contract::builder( "Greeter" )
//! 	.required( "SayHello", [], ValueType::String )
//! 	.optional( "SayGoodbye", [ ValueType::String ], ValueType::String )
//! 	.build()?;
//!
//! let engine = AdaptationEngine::new();
//!
//! // Types are instantiated through their constructor.
//! let candidates = [ CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER ))];
//! assert!( engine.is_compatible( &greeter, &candidates )? );
//! let adapter = engine.create_adapter( &greeter, &candidates )?;
//!
//! let hello: String = adapter.call( "SayHello", &[] ).unwrap();
//! assert_eq!( hello, "Hello" );
//!
//! // Unimplemented optional operations are stubs returning the default value.
//! assert!( !adapter.is_operation_implemented( "SayGoodbye" ));
//! assert_eq!( adapter.invoke( "SayGoodbye", &[ "Bob".into() ]).unwrap(), Value::Null );
//! # Ok(())
//! # }
//! ```
//!
//! # Composition
//!
//! Several candidates can back one adapter; each operation goes to the first
//! candidate that provides it. Adapters are candidates themselves, so an adapter
//! for one contract can be adapted again to another.
//!
//! # Caching
//!
//! Compatibility answers are cached per contract and candidate shape, and proxy
//! definitions per binding signature. Contracts are keyed by
//! [`Contract::identity`], which covers every operation, and shapes by
//! [`CandidateType::identity`], which carries the full Rust type path. Neither
//! cache is ever evicted: shapes do not change at runtime, and the number of
//! distinct shapes a host sees is small.
//! [`AdaptationEngine::stats`] exposes how much work was actually done.

mod value ;
mod contract ;
mod candidate ;
mod delegate_set ;
mod inspector ;
mod cache ;
mod binding ;
mod proxy ;
mod engine ;
pub mod isolation ;

#[doc( no_inline )]
pub use nonempty_collections::NEVec ;

pub use value::{ Value, ValueType, ConversionError };
pub use contract::{ Contract, ContractBuilder, Operation, Signature };
pub use candidate::{
	Candidate, CandidateType, CandidateTypeBuilder, SurfaceBuilder, CandidateRef,
	Surface, MethodMember, DelegateMember, DelegateKind,
	CallError, CallResult, Delegate, delegate,
};
pub use delegate_set::{ DelegateSet, DelegateSetBuilder };
pub use cache::{ CompatKey, CompatMode, AdaptationPlan };
pub use binding::{ Binding, BindingSet };
pub use proxy::{ Adapter, AdapterExt, Proxy, ProxyDefinition, ProxyCallError, Route };
pub use engine::{ AdaptationEngine, EngineStats, UsageError, IncompatibleContractError, AdaptError };
