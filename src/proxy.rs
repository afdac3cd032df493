//! Synthesized proxies.
//!
//! A [`ProxyDefinition`] is the reusable shape generated for one binding signature:
//! a dispatch table with one [`Route`] per contract operation. A [`Proxy`] is one
//! instance of a definition, holding the candidates and delegate values it forwards
//! to. Definitions are cached by the engine; proxies are created per adaptation.

use std::collections::HashSet ;
use std::sync::Arc ;
use once_cell::sync::OnceCell ;
use thiserror::Error ;

use crate::binding::{ Binding, BindingSet };
use crate::candidate::{ CallError, CallResult, Candidate, CandidateType, Delegate, MethodFn };
use crate::contract::Contract ;
use crate::value::Value ;



/// A contract implementation the host calls into.
///
/// Implemented by synthesized proxies, and by candidates that implement a contract
/// natively (see [`Candidate::native_adapter`]).
pub trait Adapter: Send + Sync {

	/// Name of the contract this adapter implements.
	fn contract_name( &self ) -> &str ;

	/// Invokes `operation` (matched ignoring ASCII case) with `args`.
	///
	/// # Errors
	/// Errors raised by the backing candidate are returned unchanged. Misuse of the
	/// dynamic interface is reported as a [`ProxyCallError`].
	fn invoke( &self, operation: &str, args: &[Value] ) -> CallResult ;

	/// Whether `operation` is backed by a real member rather than a stub.
	fn is_operation_implemented( &self, operation: &str ) -> bool ;

	/// The adapter as a candidate, so it can be adapted again to another contract.
	fn into_candidate( self: Arc<Self> ) -> Option<Arc<dyn Candidate>> { None }

}

/// Typed convenience over [`Adapter::invoke`].
pub trait AdapterExt: Adapter {

	/// Invokes `operation` and converts the result.
	///
	/// # Errors
	/// Fails with the invocation error, or with the conversion error if the result
	/// has an unexpected shape.
	fn call<R>( &self, operation: &str, args: &[Value] ) -> Result<R, CallError>
	where
		R: TryFrom<Value>,
		R::Error: std::error::Error + Send + Sync + 'static,
	{
		Ok( R::try_from( self.invoke( operation, args )? )? )
	}
}

impl<A: Adapter + ?Sized> AdapterExt for A {}

/// Misuse of a proxy's dynamic interface.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum ProxyCallError {
	#[error( "Contract '{contract}' has no operation '{operation}'" )]
	UnknownOperation { contract: String, operation: String },
	#[error( "Operation '{operation}' takes {expected} argument(s), {found} given" )]
	ArgumentCount { operation: String, expected: usize, found: usize },
	#[error( "Argument {position} of '{operation}' must be {expected}, found {found}" )]
	ArgumentType { operation: String, position: usize, expected: String, found: &'static str },
	#[error( "Member '{member}' was invoked on a candidate that is not a {expected}" )]
	ReceiverMismatch { member: String, expected: String },
}

/// Where a proxy sends one operation.
#[derive( Clone )]
pub enum Route {
	/// Call a method on the instance held in `slot`.
	Direct { slot: usize, call: MethodFn },
	/// Call the delegate value held at `index`.
	Delegate { index: usize },
	/// Return the default value of the operation's return type.
	Stub,
}

impl std::fmt::Debug for Route {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		match self {
			Self::Direct { slot, .. } => f.debug_struct( "Direct" ).field( "slot", slot ).finish_non_exhaustive(),
			Self::Delegate { index } => f.debug_struct( "Delegate" ).field( "index", index ).finish(),
			Self::Stub => write!( f, "Stub" ),
		}
	}
}

/// A generated proxy shape, shared by every proxy with the same binding signature.
pub struct ProxyDefinition {
	name: String,
	signature: String,
	contract: Arc<Contract>,
	routes: Vec<Route>,
	slot_count: usize,
	delegate_count: usize,
	implemented: HashSet<String>,
	shape: OnceCell<Arc<CandidateType>>,
}

impl ProxyDefinition {

	pub(crate) fn new( name: String, bindings: &BindingSet ) -> Self {
		let routes = bindings.bindings().iter()
			.map(| binding | match binding {
				Binding::Method { slot, call, .. } => Route::Direct { slot: *slot, call: Arc::clone( call ) },
				Binding::Delegate { index, .. } => Route::Delegate { index: *index },
				Binding::Unbound => Route::Stub,
			})
			.collect();
		let implemented = bindings.iter()
			.filter(|( _, binding )| binding.is_bound() )
			.map(|( operation, _ )| operation.name.to_ascii_lowercase() )
			.collect();
		Self {
			name,
			signature: bindings.signature(),
			contract: Arc::clone( bindings.contract() ),
			routes,
			slot_count: bindings.slot_count(),
			delegate_count: bindings.delegate_count(),
			implemented,
			shape: OnceCell::new(),
		}
	}

	/// Generated name, `<Contract>_proxy_<n>`.
	#[inline] pub fn name( &self ) -> &str { &self.name }
	#[inline] pub fn signature( &self ) -> &str { &self.signature }
	#[inline] pub fn contract( &self ) -> &Arc<Contract> { &self.contract }
	#[inline] pub fn routes( &self ) -> &[Route] { &self.routes }
	#[inline] pub fn slot_count( &self ) -> usize { self.slot_count }
	#[inline] pub fn delegate_count( &self ) -> usize { self.delegate_count }

	pub fn implements( &self, operation: &str ) -> bool {
		self.implemented.contains( &operation.to_ascii_lowercase() )
	}

	/// The candidate shape of proxies of this definition: one method per
	/// implemented operation. Stubbed operations are left out, so a proxy only
	/// offers what it can actually do when it is adapted again.
	pub fn shape( &self ) -> Arc<CandidateType> {
		Arc::clone( self.shape.get_or_init(|| {
			self.contract.operations().iter()
				.filter(| operation | self.implements( &operation.name ))
				.fold( CandidateType::builder::<Proxy>().named( self.name.clone() ).keyed( self.signature.clone() ), | builder, operation | {
					let name = operation.name.clone();
					builder.method( operation.name.clone(), operation.params.clone(), operation.returns.clone(), move | this: &Proxy, args | {
						this.invoke( &name, args )
					})
				})
				.build()
		}))
	}
}

impl std::fmt::Debug for ProxyDefinition {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ProxyDefinition" )
			.field( "name", &self.name )
			.field( "signature", &self.signature )
			.field( "routes", &self.routes )
			.finish_non_exhaustive()
	}
}

/// One adapter instance: a definition bound to concrete candidates and delegates.
pub struct Proxy {
	definition: Arc<ProxyDefinition>,
	instances: Vec<Arc<dyn Candidate>>,
	delegates: Vec<Delegate>,
}

impl Proxy {

	pub(crate) fn new( definition: Arc<ProxyDefinition>, instances: Vec<Arc<dyn Candidate>>, delegates: Vec<Delegate> ) -> Self {
		debug_assert_eq!( instances.len(), definition.slot_count );
		debug_assert_eq!( delegates.len(), definition.delegate_count );
		Self { definition, instances, delegates }
	}

	#[inline] pub fn definition( &self ) -> &Arc<ProxyDefinition> { &self.definition }
}

impl Adapter for Proxy {

	fn contract_name( &self ) -> &str { self.definition.contract.name() }

	fn invoke( &self, operation: &str, args: &[Value] ) -> CallResult {

		let contract = &self.definition.contract ;
		let index = contract.operation_index( operation ).ok_or_else(|| ProxyCallError::UnknownOperation {
			contract: contract.name().to_string(),
			operation: operation.to_string(),
		})?;
		let declared = &contract.operations()[index];

		if declared.params.len() != args.len() {
			return Err( ProxyCallError::ArgumentCount {
				operation: declared.name.clone(),
				expected: declared.params.len(),
				found: args.len(),
			}.into());
		}
		if let Some(( position, ( ty, arg ))) = declared.params.iter().zip( args ).enumerate().find(|( _, ( ty, arg ))| !ty.admits( arg )) {
			return Err( ProxyCallError::ArgumentType {
				operation: declared.name.clone(),
				position,
				expected: ty.to_string(),
				found: arg.kind(),
			}.into());
		}

		match &self.definition.routes[index] {
			Route::Direct { slot, call } => call( self.instances[*slot].as_ref(), args ),
			Route::Delegate { index } => ( self.delegates[*index] )( args ),
			Route::Stub => Ok( declared.returns.default_value() ),
		}

	}

	fn is_operation_implemented( &self, operation: &str ) -> bool { self.definition.implements( operation ) }

	fn into_candidate( self: Arc<Self> ) -> Option<Arc<dyn Candidate>> { Some( self as Arc<dyn Candidate> ) }

}

impl Candidate for Proxy {

	fn candidate_type( &self ) -> Arc<CandidateType> { self.definition.shape() }

	fn supports_operation( &self, operation: &str ) -> Option<bool> { Some( self.definition.implements( operation )) }

	fn native_adapter( self: Arc<Self>, contract: &Contract ) -> Option<Arc<dyn Adapter>> {
		match self.definition.contract.identity() == contract.identity() {
			true => Some( self as Arc<dyn Adapter> ),
			false => None,
		}
	}

}

impl std::fmt::Debug for Proxy {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Proxy" )
			.field( "definition", &self.definition.name )
			.field( "instances", &self.instances.iter().map(| instance | instance.candidate_type().name().to_string() ).collect::<Vec<_>>() )
			.field( "delegates", &self.delegates.len() )
			.finish()
	}
}
