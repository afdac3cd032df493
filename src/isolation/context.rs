use std::collections::HashMap ;
use std::ffi::{ OsStr, OsString };
use std::fs::File ;
use std::io::Read ;
use std::path::{ Path, PathBuf };
use std::sync::{ Arc, Mutex, RwLock, PoisonError };
use std::sync::atomic::{ AtomicUsize, Ordering };
use nonempty_collections::NEVec ;
use tracing::{ debug, warn };
use wasmtime::{ Engine, Store };
use wasmtime::component::{ Component, Instance, Linker };

use crate::candidate::{ Candidate, CandidateRef, CandidateType };
use crate::contract::Contract ;
use crate::engine::AdaptationEngine ;
use crate::proxy::Adapter ;
use super::{ IsolationConfig, IsolationError, LoadStrategy, ConfigError };
use super::resolver::{ OverrideResolver, ParentLookup, UnitResolver };
use super::unit::{ IsolatedCandidate, LoadedUnit, export_names };



/// Serials handed to loaded units across every host of the process.
static UNIT_SERIALS: AtomicUsize = AtomicUsize::new( 0 );

/// Lifecycle of an [`IsolationContext`].
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum Phase {
	/// Created, nothing loaded yet.
	Created,
	/// At least one unit loaded.
	Active,
	/// Teardown in progress.
	Unloading,
	/// Torn down. Terminal.
	Unloaded,
}

/// Units loaded by every context of one host.
#[derive( Debug, Default )]
pub(crate) struct HostRegistry {
	contexts: AtomicUsize,
	loaded: RwLock<HashMap<String, Vec<( usize, PathBuf )>>>,
}

impl HostRegistry {

	fn register( &self, name: &str, context: usize, location: PathBuf ) {
		self.loaded.write().unwrap_or_else( PoisonError::into_inner )
			.entry( name.to_ascii_lowercase() )
			.or_default()
			.push(( context, location ));
	}

	fn forget( &self, context: usize ) {
		self.loaded.write().unwrap_or_else( PoisonError::into_inner ).retain(| _, entries | {
			entries.retain(|( owner, _ )| *owner != context );
			!entries.is_empty()
		});
	}
}

impl ParentLookup for HostRegistry {
	fn loaded_location( &self, name: &str ) -> Option<PathBuf> {
		self.loaded.read().unwrap_or_else( PoisonError::into_inner )
			.get( &name.to_ascii_lowercase() )
			.and_then(| entries | entries.first() )
			.map(|( _, location )| location.clone() )
	}
}

/// Creates isolation contexts that share one wasmtime engine and one adaptation engine.
pub struct IsolationHost {
	engine: Engine,
	adaptation: Arc<AdaptationEngine>,
	base_paths: Vec<PathBuf>,
	registry: Arc<HostRegistry>,
}

impl IsolationHost {

	pub fn new( adaptation: Arc<AdaptationEngine> ) -> Self { Self::with_engine( Engine::default(), adaptation ) }

	/// Uses a caller-configured wasmtime engine.
	pub fn with_engine( engine: Engine, adaptation: Arc<AdaptationEngine> ) -> Self {
		let base_paths = std::env::current_exe().ok()
			.and_then(| exe | exe.parent().map( Path::to_path_buf ))
			.into_iter()
			.collect();
		Self { engine, adaptation, base_paths, registry: Arc::new( HostRegistry::default() ) }
	}

	/// Replaces the base search paths, which default to the hosting binary's directory.
	pub fn with_base_paths( mut self, paths: impl IntoIterator<Item = impl Into<PathBuf>> ) -> Self {
		self.base_paths = paths.into_iter().map( Into::into ).collect();
		self
	}

	#[inline] pub fn engine( &self ) -> &Engine { &self.engine }
	#[inline] pub fn adaptation( &self ) -> &Arc<AdaptationEngine> { &self.adaptation }
	#[inline] pub fn base_paths( &self ) -> &[PathBuf] { &self.base_paths }

	/// Where some context of this host loaded the unit `name`, if any did.
	pub fn loaded_location( &self, name: &str ) -> Option<PathBuf> { self.registry.loaded_location( name ) }

	/// Creates a context with default settings and the given search paths. Each
	/// entry may itself join several paths with the platform path separator.
	///
	/// # Errors
	/// As [`create_context`]( Self::create_context ).
	pub fn create_isolated_context( &self, search_paths: impl IntoIterator<Item = impl AsRef<OsStr>> ) -> Result<IsolationContext, IsolationError> {
		let config = search_paths.into_iter()
			.fold( IsolationConfig::new( "" ), | config, path | config.with_search_path( path.as_ref() ));
		self.create_context( &config )
	}

	/// Creates a context from `config`.
	///
	/// # Errors
	/// Returns [`IsolationError::Config`] if the configuration lists no extensions.
	pub fn create_context( &self, config: &IsolationConfig ) -> Result<IsolationContext, IsolationError> {

		let ( first, rest ) = config.extensions.split_first().ok_or( ConfigError::NoExtensions )?;
		let mut extensions = NEVec::new( first.clone() );
		for extension in rest { extensions.push( extension.clone() ); }

		let mut resolver = UnitResolver::new( extensions );
		if config.include_host_paths {
			for path in &self.base_paths { resolver.add_path( path ); }
		}
		for path in &config.search_paths { resolver.add_path( path ); }

		let id = self.registry.contexts.fetch_add( 1, Ordering::Relaxed ) + 1 ;
		let name = match config.name.is_empty() {
			true => format!( "isolated-{}", id ),
			false => config.name.clone(),
		};
		let ( shadow_directory, owns_shadow_directory ) = match &config.shadow_directory {
			Some( path ) => ( path.clone(), false ),
			None => ( std::env::temp_dir().join( format!( "provider-link-{}-{}", std::process::id(), id )), true ),
		};

		debug!( context = %name, id, search_paths = ?resolver.search_paths(), "Isolation context created" );

		Ok( IsolationContext { shared: Arc::new( ContextShared {
			id,
			name,
			engine: self.engine.clone(),
			adaptation: Arc::clone( &self.adaptation ),
			registry: Arc::clone( &self.registry ),
			resolver: RwLock::new( resolver ),
			strategy: config.strategy,
			shadow_directory,
			owns_shadow_directory,
			state: Mutex::new( ContextState {
				phase: Phase::Created,
				store: Some( Store::new( &self.engine, () )),
				linker: Linker::new( &self.engine ),
				units: Vec::new(),
			}),
		})})

	}
}

impl std::fmt::Debug for IsolationHost {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "IsolationHost" )
			.field( "base_paths", &self.base_paths )
			.field( "registry", &self.registry )
			.finish_non_exhaustive()
	}
}

pub(crate) struct UnitState {
	instance: Instance,
	/// Open handle of a [`LoadStrategy::Locked`] unit.
	_lock: Option<File>,
	shadow: Option<PathBuf>,
}

pub(crate) struct ContextState {
	phase: Phase,
	store: Option<Store<()>>,
	linker: Linker<()>,
	units: Vec<UnitState>,
}

impl ContextState {

	/// The store and instance of a loaded unit, or `None` once unloaded.
	pub(crate) fn instance_of( &mut self, unit: usize ) -> Option<( &mut Store<()>, Instance )> {
		let instance = self.units.get( unit )?.instance ;
		self.store.as_mut().map(| store | ( store, instance ))
	}

	fn is_torn_down( &self ) -> bool { matches!( self.phase, Phase::Unloading | Phase::Unloaded ) }
}

pub(crate) struct ContextShared {
	id: usize,
	pub(crate) name: String,
	engine: Engine,
	adaptation: Arc<AdaptationEngine>,
	registry: Arc<HostRegistry>,
	resolver: RwLock<UnitResolver>,
	strategy: LoadStrategy,
	shadow_directory: PathBuf,
	owns_shadow_directory: bool,
	pub(crate) state: Mutex<ContextState>,
}

impl ContextShared {

	fn unloaded( &self ) -> IsolationError { IsolationError::Unloaded { context: self.name.clone() }}

	/// Drops the store and units and removes shadow copies. Returns `false` if the
	/// context was already torn down.
	fn teardown( &self ) -> bool {

		let units = {
			let mut state = self.state.lock().unwrap_or_else( PoisonError::into_inner );
			if state.is_torn_down() { return false }
			state.phase = Phase::Unloading ;
			state.store = None ;
			std::mem::take( &mut state.units )
		};

		for shadow in units.into_iter().filter_map(| unit | unit.shadow ) {
			if let Err( err ) = std::fs::remove_file( &shadow ) {
				warn!( context = %self.name, path = %shadow.display(), %err, "Failed to remove shadow copy" );
			}
		}
		if self.owns_shadow_directory && self.shadow_directory.exists() {
			if let Err( err ) = std::fs::remove_dir( &self.shadow_directory ) {
				warn!( context = %self.name, path = %self.shadow_directory.display(), %err, "Failed to remove shadow directory" );
			}
		}

		self.registry.forget( self.id );
		self.state.lock().unwrap_or_else( PoisonError::into_inner ).phase = Phase::Unloaded ;
		true

	}
}

impl Drop for ContextShared {
	fn drop( &mut self ) { self.teardown(); }
}

/// An isolated, unloadable set of loaded units.
///
/// Units are resolved through the context's own search paths and live in the
/// context's own wasmtime store. Unloading drops the store; objects from the
/// context stay reachable through existing adapters, but every call through them
/// fails with [`IsolationError::Unloaded`].
pub struct IsolationContext {
	shared: Arc<ContextShared>,
}

impl IsolationContext {

	#[inline] pub fn name( &self ) -> &str { &self.shared.name }
	#[inline] pub fn strategy( &self ) -> LoadStrategy { self.shared.strategy }
	#[inline] pub fn shadow_directory( &self ) -> &Path { &self.shared.shadow_directory }

	pub fn phase( &self ) -> Phase { self.shared.state.lock().unwrap_or_else( PoisonError::into_inner ).phase }

	pub fn search_paths( &self ) -> Vec<PathBuf> {
		self.shared.resolver.read().unwrap_or_else( PoisonError::into_inner ).search_paths().to_vec()
	}

	/// Registers search paths, see [`UnitResolver::add_path`].
	pub fn add_search_path( &self, paths: impl AsRef<OsStr> ) {
		self.shared.resolver.write().unwrap_or_else( PoisonError::into_inner ).add_path( paths );
	}

	/// Installs a resolver consulted before the search paths.
	pub fn set_override_resolver( &self, resolver: impl Fn( &str, &dyn ParentLookup ) -> Option<PathBuf> + Send + Sync + 'static ) {
		let resolver: OverrideResolver = Arc::new( resolver );
		self.shared.resolver.write().unwrap_or_else( PoisonError::into_inner ).set_override( Some( resolver ));
	}

	/// Resolves `reference` and loads the unit, with `strategy` or the context's default.
	///
	/// # Errors
	/// [`IsolationError::Unresolved`] if no file matches, [`IsolationError::Io`],
	/// [`IsolationError::Compile`] or [`IsolationError::Instantiate`] if loading
	/// fails, [`IsolationError::Unloaded`] once the context is torn down.
	pub fn load( &self, reference: &str, strategy: Option<LoadStrategy> ) -> Result<LoadedUnit, IsolationError> {

		let shared = &self.shared ;
		let strategy = strategy.unwrap_or( shared.strategy );
		if shared.state.lock().unwrap_or_else( PoisonError::into_inner ).is_torn_down() {
			return Err( shared.unloaded() );
		}
		let serial = UNIT_SERIALS.fetch_add( 1, Ordering::Relaxed ) + 1 ;

		let location = shared.resolver.read().unwrap_or_else( PoisonError::into_inner )
			.resolve( reference, shared.registry.as_ref() )?;
		let name = location.file_stem()
			.and_then( OsStr::to_str )
			.unwrap_or( reference )
			.to_string();

		let ( bytes, lock, shadow, symbols ) = match strategy {
			LoadStrategy::Locked => {
				let mut file = File::open( &location ).map_err( IsolationError::io( &location ))?;
				let mut bytes = Vec::new();
				file.read_to_end( &mut bytes ).map_err( IsolationError::io( &location ))?;
				( bytes, Some( file ), None, None )
			}
			LoadStrategy::ShadowCopy => {
				std::fs::create_dir_all( &shared.shadow_directory ).map_err( IsolationError::io( &shared.shadow_directory ))?;
				let file_name = location.file_name().map_or_else(|| format!( "{}.wasm", name ).into(), OsStr::to_os_string );
				let mut copy_name = OsString::from( format!( "{}-", serial ));
				copy_name.push( file_name );
				let copy = shared.shadow_directory.join( copy_name );
				std::fs::copy( &location, &copy ).map_err( IsolationError::io( &copy ))?;
				if let Some( original ) = location.parent() { self.add_search_path( original ); }
				let bytes = std::fs::read( &copy ).map_err( IsolationError::io( &copy ))?;
				( bytes, None, Some( copy ), None )
			}
			LoadStrategy::Bytes => {
				let bytes = std::fs::read( &location ).map_err( IsolationError::io( &location ))?;
				let symbols = Some( location.with_extension( "dwp" )).filter(| path | path.is_file() );
				( bytes, None, None, symbols )
			}
		};

		let loaded_from = shadow.clone().unwrap_or_else(|| location.clone() );
		let discard = || if let Some( copy ) = &shadow { let _ = std::fs::remove_file( copy ); };

		let component = match Component::new( &shared.engine, &bytes ) {
			Ok( component ) => component,
			Err( err ) => { discard(); return Err( IsolationError::Compile( err )) }
		};

		let mut guard = shared.state.lock().unwrap_or_else( PoisonError::into_inner );
		if guard.is_torn_down() || guard.store.is_none() {
			drop( guard );
			discard();
			return Err( shared.unloaded() );
		}
		let state = &mut *guard ;
		let Some( store ) = state.store.as_mut() else { return Err( shared.unloaded() ) };
		let instance = match state.linker.instantiate( &mut *store, &component ) {
			Ok( instance ) => instance,
			Err( err ) => { drop( guard ); discard(); return Err( IsolationError::Instantiate( err )) }
		};

		state.units.push( UnitState { instance, _lock: lock, shadow });
		state.phase = Phase::Active ;
		let index = state.units.len() - 1 ;
		drop( guard );

		shared.registry.register( &name, shared.id, loaded_from.clone() );
		debug!( context = %shared.name, unit = %name, serial, path = %loaded_from.display(), ?strategy, "Unit loaded" );

		Ok( LoadedUnit { context: shared.id, index, serial, name, location, loaded_from, strategy, symbols })

	}

	/// Exposes a loaded unit as a candidate for `contract`.
	///
	/// `interface` names the exported instance holding the functions, `None` for
	/// functions exported at the top level. Every contract operation is looked up
	/// by its verbatim name, then in kebab-case (`GetName` as `get-name`); the
	/// operations found make up the candidate's shape.
	///
	/// # Errors
	/// [`IsolationError::ForeignUnit`] for a unit of another context,
	/// [`IsolationError::MissingExport`] if `interface` is not exported,
	/// [`IsolationError::Unloaded`] once the context is torn down.
	pub fn candidate( &self, unit: &LoadedUnit, interface: Option<&str>, contract: &Contract ) -> Result<Arc<dyn Candidate>, IsolationError> {

		let shared = &self.shared ;
		if unit.context != shared.id {
			return Err( IsolationError::ForeignUnit { unit: unit.name.clone(), context: shared.name.clone() });
		}

		let mut state = shared.state.lock().unwrap_or_else( PoisonError::into_inner );
		let ( store, instance ) = state.instance_of( unit.index ).ok_or_else(|| shared.unloaded() )?;

		let interface_index = match interface {
			Some( path ) => Some( instance.get_export_index( &mut *store, None, path )
				.ok_or_else(|| IsolationError::MissingExport { unit: unit.name.clone(), export: path.to_string() })? ),
			None => None,
		};

		let mut exports = Vec::new();
		for operation in contract.operations() {
			let found = export_names( &operation.name ).into_iter().find(| export | instance
				.get_export_index( &mut *store, interface_index.as_ref(), export )
				.is_some_and(| index | instance.get_func( &mut *store, index ).is_some() ));
			if let Some( export ) = found { exports.push(( operation, export )); }
		}
		drop( state );

		let shape_name = format!( "{}/{}#{}", unit.name, interface.unwrap_or( "" ), contract.name() );
		let builder = CandidateType::builder::<IsolatedCandidate>()
			.named( shape_name )
			.keyed( format!( "unit-{}", unit.serial ));
		let shape = exports.into_iter()
			.fold( builder, | builder, ( operation, export )| {
				let returns = operation.returns.clone();
				builder.method( operation.name.clone(), operation.params.clone(), operation.returns.clone(), move | this: &IsolatedCandidate, args | {
					this.call( &export, &returns, args ).map_err( Into::into )
				})
			})
			.build();

		debug!( context = %shared.name, unit = %unit.name, shape = shape.name(), "Isolated candidate created" );

		Ok( Arc::new( IsolatedCandidate {
			shared: Arc::clone( shared ),
			unit: unit.index,
			interface: interface.map( str::to_string ),
			shape,
		}))

	}

	/// Adapts a loaded unit to `contract` through the host's adaptation engine.
	///
	/// # Errors
	/// As [`candidate`]( Self::candidate ), plus [`IsolationError::Adapt`] if the
	/// unit's exports do not satisfy the contract.
	pub fn adapt( &self, unit: &LoadedUnit, interface: Option<&str>, contract: &Arc<Contract> ) -> Result<Arc<dyn Adapter>, IsolationError> {
		let candidate = self.candidate( unit, interface, contract )?;
		Ok( self.shared.adaptation.create_adapter( contract, &[ CandidateRef::Instance( candidate )])? )
	}

	/// Unloads the context: drops its store and units, removes shadow copies and
	/// forgets its units in the host registry. Idempotent.
	pub fn unload( &self ) {
		if self.shared.teardown() {
			debug!( context = %self.shared.name, "Isolation context unloaded" );
		}
	}
}

impl std::fmt::Debug for IsolationContext {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "IsolationContext" )
			.field( "name", &self.shared.name )
			.field( "phase", &self.phase() )
			.field( "search_paths", &self.search_paths() )
			.finish_non_exhaustive()
	}
}
