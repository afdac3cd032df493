use std::collections::HashMap ;
use std::sync::{ Arc, Mutex, RwLock, PoisonError };
use tracing::{ debug, trace };

use crate::binding::BindingSet ;
use crate::proxy::ProxyDefinition ;



/// Which question a cached compatibility answer belongs to.
#[derive( Clone, Copy, Debug, PartialEq, Eq, Hash )]
pub enum CompatMode {
	/// Every type is constructible and their methods cover the required operations.
	Creatable,
	/// Instances (or a mix of types and instances) provide the required operations.
	/// Instance entries are keyed by their full shape, see [`CompatKey::types`].
	Instances,
}

#[derive( Clone, Debug, PartialEq, Eq, Hash )]
pub struct CompatKey {
	/// The contract's structural identity, see [`Contract::identity`]( crate::Contract::identity ).
	pub contract: String,
	pub mode: CompatMode,
	/// One entry per candidate in caller order: the type identity, extended for
	/// instances with the presence of each delegate value and the support marker.
	pub types: Vec<String>,
}

/// Memoized compatibility answers. An answer is computed at most once per key
/// under normal operation and never evicted.
#[derive( Debug, Default )]
pub struct CompatibilityCache {
	entries: RwLock<HashMap<CompatKey, bool>>,
}

impl CompatibilityCache {

	/// Returns the cached answer for `key`, or computes and stores it.
	///
	/// Two threads racing on the same key may both compute; the first stored answer wins.
	pub fn get_or_compute( &self, key: CompatKey, compute: impl FnOnce() -> bool ) -> bool {

		if let Some( answer ) = self.entries.read().unwrap_or_else( PoisonError::into_inner ).get( &key ) {
			trace!( contract = %key.contract, mode = ?key.mode, "Compatibility cache hit" );
			return *answer ;
		}

		let answer = compute();
		debug!( contract = %key.contract, mode = ?key.mode, types = ?key.types, answer, "Compatibility computed" );
		*self.entries.write().unwrap_or_else( PoisonError::into_inner ).entry( key ).or_insert( answer )

	}

	pub fn len( &self ) -> usize { self.entries.read().unwrap_or_else( PoisonError::into_inner ).len() }
	pub fn is_empty( &self ) -> bool { self.len() == 0 }
}

/// A resolved binding set together with the proxy definition it maps to.
#[derive( Debug )]
pub struct AdaptationPlan {
	pub bindings: BindingSet,
	pub definition: Arc<ProxyDefinition>,
}

#[derive( Default )]
struct ProxyCacheState {
	by_signature: HashMap<String, Arc<ProxyDefinition>>,
	by_name: HashMap<String, Arc<ProxyDefinition>>,
	plans: HashMap<CompatKey, Arc<AdaptationPlan>>,
	counter: usize,
}

/// Generated proxy definitions, keyed by binding signature and registered by name,
/// plus the binding plans resolved for each candidate shape.
#[derive( Default )]
pub struct ProxyCache {
	state: Mutex<ProxyCacheState>,
}

impl ProxyCache {

	/// Looks up the definition for `signature`, or creates one named `<contract>_proxy_<n>`.
	///
	/// Returns the definition and whether it was created by this call.
	pub fn get_or_create(
		&self,
		contract: &str,
		signature: &str,
		create: impl FnOnce( String ) -> ProxyDefinition,
	) -> ( Arc<ProxyDefinition>, bool ) {

		let mut state = self.state.lock().unwrap_or_else( PoisonError::into_inner );

		if let Some( definition ) = state.by_signature.get( signature ) {
			trace!( name = definition.name(), "Proxy definition cache hit" );
			return ( Arc::clone( definition ), false );
		}

		state.counter += 1 ;
		let name = format!( "{}_proxy_{}", contract, state.counter );
		let definition = Arc::new( create( name.clone() ));
		debug!( %name, %signature, "Proxy definition created" );
		state.by_signature.insert( signature.to_string(), Arc::clone( &definition ));
		state.by_name.insert( name, Arc::clone( &definition ));
		( definition, true )

	}

	pub fn plan( &self, key: &CompatKey ) -> Option<Arc<AdaptationPlan>> {
		let plan = self.state.lock().unwrap_or_else( PoisonError::into_inner ).plans.get( key ).cloned();
		if let Some( plan ) = &plan { trace!( name = plan.definition.name(), "Binding plan cache hit" ); }
		plan
	}

	/// Stores `plan` for `key` unless another thread stored one first, and returns
	/// the stored plan.
	pub fn store_plan( &self, key: CompatKey, plan: AdaptationPlan ) -> Arc<AdaptationPlan> {
		Arc::clone( self.state.lock().unwrap_or_else( PoisonError::into_inner ).plans.entry( key ).or_insert_with(|| Arc::new( plan )))
	}

	pub fn plan_count( &self ) -> usize { self.state.lock().unwrap_or_else( PoisonError::into_inner ).plans.len() }

	pub fn by_name( &self, name: &str ) -> Option<Arc<ProxyDefinition>> {
		self.state.lock().unwrap_or_else( PoisonError::into_inner ).by_name.get( name ).cloned()
	}

	pub fn len( &self ) -> usize { self.state.lock().unwrap_or_else( PoisonError::into_inner ).by_signature.len() }
	pub fn is_empty( &self ) -> bool { self.len() == 0 }
}

impl std::fmt::Debug for ProxyCache {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ProxyCache" ).field( "definitions", &self.len() ).finish()
	}
}
