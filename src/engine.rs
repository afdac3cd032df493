use std::sync::Arc ;
use std::sync::atomic::{ AtomicUsize, Ordering };
use itertools::{ Either, Itertools };
use thiserror::Error ;
use tracing::debug ;

use crate::binding::BindingSet ;
use crate::cache::{ AdaptationPlan, CompatKey, CompatMode, CompatibilityCache, ProxyCache };
use crate::candidate::{ Candidate, CandidateRef, CandidateType };
use crate::contract::{ Contract, Operation };
use crate::inspector ;
use crate::proxy::{ Adapter, Proxy, ProxyDefinition };



/// The adaptation engine: capability inspection, compatibility caching and proxy
/// synthesis behind one object.
///
/// All caches live inside the engine and are never evicted. The engine is
/// `Send + Sync` and meant to be shared (usually behind an [`Arc`]) by everything
/// that adapts candidates during the lifetime of a host.
///
/// ```
/// use provider_link::{ AdaptationEngine, Adapter, CandidateRef, Contract, DelegateSet, Value, ValueType, delegate };
///
/// let contract = Contract::builder( "Greeter" )
/// 	.required( "SayHello", [], ValueType::String )
/// 	.optional( "SayGoodbye", [], ValueType::String )
/// 	.build()
/// 	.unwrap();
///
/// let provider = DelegateSet::builder()
/// 	.with( "sayhello", [], ValueType::String, delegate(| _ | Ok( "Hello".into() )))
/// 	.build();
///
/// let engine = AdaptationEngine::new();
/// let candidates = [ CandidateRef::instance( provider )];
/// assert!( engine.is_compatible( &contract, &candidates ).unwrap() );
///
/// let greeter = engine.create_adapter( &contract, &candidates ).unwrap();
/// assert_eq!( greeter.invoke( "SayHello", &[] ).unwrap(), Value::from( "Hello" ));
/// assert_eq!( greeter.invoke( "SayGoodbye", &[] ).unwrap(), Value::Null );
/// assert!( !greeter.is_operation_implemented( "SayGoodbye" ));
/// ```
#[derive( Debug, Default )]
pub struct AdaptationEngine {
	compatibility: CompatibilityCache,
	proxies: ProxyCache,
	structural_scans: AtomicUsize,
}

/// Counters exposed for diagnostics and tests.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub struct EngineStats {
	/// Structural inspections performed; only cache misses count.
	pub structural_scans: usize,
	pub compatibility_entries: usize,
	pub proxy_definitions: usize,
	pub binding_plans: usize,
}

/// The caller broke an API precondition.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum UsageError {
	#[error( "Contract '{0}' does not declare any operations" )] ContractHasNoOperations( String ),
	#[error( "No candidates given" )] NoCandidates,
	#[error( "Contract '{contract}' declares operation '{operation}' more than once" )]
	DuplicateOperation { contract: String, operation: String },
}

/// The candidates cannot satisfy the contract.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct IncompatibleContractError {
	pub contract: String,
	/// Type names of the candidates, in caller order.
	pub candidates: Vec<String>,
	/// Names of the required operations nothing implements.
	pub missing_operations: Vec<String>,
	/// The same operations as signature strings, e.g. `string SayHello()`.
	pub missing_signatures: Vec<String>,
	pub types_lacking_default_constructor: Vec<String>,
}

impl std::fmt::Display for IncompatibleContractError {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		let candidates = self.candidates.iter().map(| name | format!( "'{}'", name )).join( ", " );
		write!( f, "Candidates ({}) are incompatible with contract '{}'", candidates, self.contract )?;
		if !self.types_lacking_default_constructor.is_empty() {
			write!( f, "\nTypes ({}) do not support a default constructor",
				self.types_lacking_default_constructor.iter().map(| name | format!( "'{}'", name )).join( ", " ))?;
		}
		if !self.missing_signatures.is_empty() {
			write!( f, "\nCandidates ({}) are missing the following operations from contract '{}':\n  {}",
				candidates,
				self.contract,
				self.missing_signatures.iter().map(| signature | format!( "'{}'", signature )).join( "\n  " ))?;
		}
		Ok(())
	}
}

impl std::error::Error for IncompatibleContractError {}

#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum AdaptError {
	#[error( "Usage Error: {0}" )] Usage( #[from] UsageError ),
	#[error( "{0}" )] Incompatible( #[from] IncompatibleContractError ),
}

impl AdaptationEngine {

	pub fn new() -> Self { Self::default() }

	/// Whether every type can be constructed and their methods together cover every
	/// required operation. Delegate members are ignored since their values only
	/// exist on instances.
	///
	/// # Errors
	/// Returns a [`UsageError`] if the contract has no operations or `types` is empty.
	pub fn is_type_compatible( &self, contract: &Contract, types: &[Arc<CandidateType>] ) -> Result<bool, UsageError> {
		validate( contract, types.len() )?;
		Ok( self.types_compatible( contract, types ))
	}

	/// Whether the instances together provide every required operation, by a method
	/// or by a delegate member currently holding a value, honoring each instance's
	/// support marker.
	///
	/// # Errors
	/// Returns a [`UsageError`] if the contract has no operations or `instances` is empty.
	pub fn is_instance_compatible( &self, contract: &Contract, instances: &[Arc<dyn Candidate>] ) -> Result<bool, UsageError> {
		validate( contract, instances.len() )?;
		Ok( self.instances_compatible( contract, instances ))
	}

	/// Compatibility of a candidate list that may mix types and instances. Types
	/// must be constructible and contribute their methods; instances contribute
	/// methods and delegate members.
	///
	/// # Errors
	/// Returns a [`UsageError`] if the contract has no operations or `candidates` is empty.
	pub fn is_compatible( &self, contract: &Contract, candidates: &[CandidateRef] ) -> Result<bool, UsageError> {
		validate( contract, candidates.len() )?;

		let ( types, instances ) = split( candidates );

		if instances.is_empty() { return Ok( self.types_compatible( contract, &types )) }
		if types.is_empty() { return Ok( self.instances_compatible( contract, &instances )) }

		let key = CompatKey {
			contract: contract.identity().to_string(),
			mode: CompatMode::Instances,
			types: candidates.iter().map(| candidate | match candidate {
				CandidateRef::Type( ty ) => format!( "type {}", ty.identity() ),
				CandidateRef::Instance( instance ) => instance_shape( contract, instance.as_ref() ),
			}).collect(),
		};
		Ok( self.compatibility.get_or_compute( key, || self.scan(||
			inspector::lacking_constructor( &types ).is_empty() && missing_from_candidates( contract, candidates ).is_empty()
		)))
	}

	/// Keeps the types that are individually type-compatible with `contract`.
	///
	/// # Errors
	/// Returns [`UsageError::ContractHasNoOperations`] for an empty contract.
	pub fn filter_compatible_types( &self, contract: &Contract, types: &[Arc<CandidateType>] ) -> Result<Vec<Arc<CandidateType>>, UsageError> {
		if contract.operations().is_empty() {
			return Err( UsageError::ContractHasNoOperations( contract.name().to_string() ));
		}
		Ok( types.iter()
			.filter(| ty | self.types_compatible( contract, std::slice::from_ref( *ty )))
			.cloned()
			.collect())
	}

	/// Adapts `candidates` to `contract`.
	///
	/// A lone instance that natively implements the contract is returned as is.
	/// Otherwise types are instantiated through their constructors, every operation
	/// is bound to the first matching member in caller order, and a proxy is built
	/// from the cached definition for that binding signature.
	///
	/// # Errors
	/// [`AdaptError::Usage`] for an empty contract or candidate list,
	/// [`AdaptError::Incompatible`] if a type lacks a constructor or a required
	/// operation cannot be bound.
	pub fn create_adapter( &self, contract: &Arc<Contract>, candidates: &[CandidateRef] ) -> Result<Arc<dyn Adapter>, AdaptError> {

		validate( contract, candidates.len() )?;

		if let [ CandidateRef::Instance( instance )] = candidates {
			if let Some( native ) = Arc::clone( instance ).native_adapter( contract ) {
				debug!( contract = contract.name(), candidate = instance.candidate_type().name(), "Candidate implements contract natively" );
				return Ok( native );
			}
		}

		let types = candidates.iter().map( CandidateRef::candidate_type ).collect::<Vec<_>>();

		let Some( instances ) = candidates.iter()
			.map(| candidate | match candidate {
				CandidateRef::Type( ty ) => ty.instantiate(),
				CandidateRef::Instance( instance ) => Some( Arc::clone( instance )),
			})
			.collect::<Option<Vec<_>>>()
		else {
			let lacking = candidates.iter()
				.filter_map(| candidate | match candidate {
					CandidateRef::Type( ty ) if !ty.has_constructor() => Some( Arc::clone( ty )),
					_ => None,
				})
				.collect::<Vec<_>>();
			return Err( incompatible( contract, &types, &missing_from_candidates( contract, candidates ), inspector::lacking_constructor( &lacking )).into());
		};

		let key = instances_key( contract, &instances );
		if !self.compatibility.get_or_compute( key.clone(), || self.scan(|| inspector::missing_from_instances( contract, &instances ).is_empty() )) {
			return Err( incompatible( contract, &types, &inspector::missing_from_instances( contract, &instances ), Vec::new() ).into());
		}

		let plan = match self.proxies.plan( &key ) {
			Some( plan ) => plan,
			None => self.plan( contract, &types, &instances, Some( key ))?,
		};

		let ( slots, delegates ) = match plan.bindings.bind( &instances ) {
			Some( parts ) => parts,
			None => {
				// A delegate member lost its value after the shape was taken.
				let plan = self.plan( contract, &types, &instances, None )?;
				let parts = plan.bindings.bind( &instances ).ok_or_else(||
					incompatible( contract, &types, &plan.bindings.missing_required(), Vec::new() ))?;
				return Ok( Arc::new( Proxy::new( Arc::clone( &plan.definition ), parts.0, parts.1 )));
			}
		};

		Ok( Arc::new( Proxy::new( Arc::clone( &plan.definition ), slots, delegates )))

	}

	/// Looks up a generated proxy definition by its name.
	pub fn proxy_definition( &self, name: &str ) -> Option<Arc<ProxyDefinition>> { self.proxies.by_name( name ) }

	pub fn stats( &self ) -> EngineStats {
		EngineStats {
			structural_scans: self.structural_scans.load( Ordering::Relaxed ),
			compatibility_entries: self.compatibility.len(),
			proxy_definitions: self.proxies.len(),
			binding_plans: self.proxies.plan_count(),
		}
	}

	fn scan<R>( &self, inspect: impl FnOnce() -> R ) -> R {
		self.structural_scans.fetch_add( 1, Ordering::Relaxed );
		inspect()
	}

	fn types_compatible( &self, contract: &Contract, types: &[Arc<CandidateType>] ) -> bool {
		let key = CompatKey {
			contract: contract.identity().to_string(),
			mode: CompatMode::Creatable,
			types: types.iter().map(| ty | ty.identity().to_string() ).collect(),
		};
		self.compatibility.get_or_compute( key, || self.scan(||
			inspector::lacking_constructor( types ).is_empty() && inspector::missing_from_types( contract, types ).is_empty()
		))
	}

	fn instances_compatible( &self, contract: &Contract, instances: &[Arc<dyn Candidate>] ) -> bool {
		self.compatibility.get_or_compute( instances_key( contract, instances ), || self.scan(||
			inspector::missing_from_instances( contract, instances ).is_empty()
		))
	}

	fn plan(
		&self,
		contract: &Arc<Contract>,
		types: &[Arc<CandidateType>],
		instances: &[Arc<dyn Candidate>],
		key: Option<CompatKey>,
	) -> Result<Arc<AdaptationPlan>, IncompatibleContractError> {

		let bindings = self.scan(|| BindingSet::resolve( contract, instances ));

		let missing = bindings.missing_required();
		debug_assert!( missing.is_empty(), "compatible candidates left required operations unbound: {:?}", missing );
		if !missing.is_empty() {
			return Err( incompatible( contract, types, &missing, Vec::new() ));
		}

		let ( definition, _ ) = self.proxies.get_or_create( contract.name(), &bindings.signature(), | name | ProxyDefinition::new( name, &bindings ));
		let plan = AdaptationPlan { bindings, definition };

		Ok( match key {
			Some( key ) => self.proxies.store_plan( key, plan ),
			None => Arc::new( plan ),
		})

	}
}

fn validate( contract: &Contract, candidates: usize ) -> Result<(), UsageError> {
	if contract.operations().is_empty() {
		return Err( UsageError::ContractHasNoOperations( contract.name().to_string() ));
	}
	match candidates {
		0 => Err( UsageError::NoCandidates ),
		_ => Ok(()),
	}
}

/// Everything about an instance that decides binding: its type identity, which
/// delegate members hold a value, and what its support marker says about each
/// operation.
fn instance_shape( contract: &Contract, instance: &dyn Candidate ) -> String {
	let ty = instance.candidate_type();
	let present = ty.delegates()
		.map(|( _, member )| match ( member.getter )( instance ).is_some() { true => '1', false => '0' })
		.collect::<String>();
	let marker = contract.operations().iter()
		.map(| operation | match instance.supports_operation( &operation.name ) {
			None => '?',
			Some( true ) => '+',
			Some( false ) => '-',
		})
		.collect::<String>();
	format!( "{}[{}][{}]", ty.identity(), present, marker )
}

/// Required operations neither a type's methods nor an instance provide.
fn missing_from_candidates<'a>( contract: &'a Contract, candidates: &[CandidateRef] ) -> Vec<&'a Operation> {
	let ( types, instances ) = split( candidates );
	inspector::missing_from_instances( contract, &instances ).into_iter()
		.filter(| operation | !types.iter().any(| ty | inspector::find_method( ty, operation ).is_some() ))
		.collect()
}

fn split( candidates: &[CandidateRef] ) -> ( Vec<Arc<CandidateType>>, Vec<Arc<dyn Candidate>> ) {
	candidates.iter().partition_map(| candidate | match candidate {
		CandidateRef::Type( ty ) => Either::Left( Arc::clone( ty )),
		CandidateRef::Instance( instance ) => Either::Right( Arc::clone( instance )),
	})
}

fn instances_key( contract: &Contract, instances: &[Arc<dyn Candidate>] ) -> CompatKey {
	CompatKey {
		contract: contract.identity().to_string(),
		mode: CompatMode::Instances,
		types: instances.iter().map(| instance | instance_shape( contract, instance.as_ref() )).collect(),
	}
}

fn incompatible(
	contract: &Contract,
	types: &[Arc<CandidateType>],
	missing: &[&Operation],
	types_lacking_default_constructor: Vec<String>,
) -> IncompatibleContractError {
	IncompatibleContractError {
		contract: contract.name().to_string(),
		candidates: types.iter().map(| ty | ty.name().to_string() ).collect(),
		missing_operations: missing.iter().map(| operation | operation.name.clone() ).collect(),
		missing_signatures: missing.iter().map(| operation | operation.signature_string() ).collect(),
		types_lacking_default_constructor,
	}
}
