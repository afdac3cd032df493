use std::path::PathBuf ;
use std::sync::Arc ;
use provider_link::AdaptationEngine ;
use provider_link::isolation::{ ConfigError, IsolationConfig, IsolationError, IsolationHost, LoadStrategy };

use crate::fixtures ;

#[test]
fn toml_defaults() {

	let config = IsolationConfig::from_toml_str( "" ).unwrap();

	assert_eq!( config, IsolationConfig::default() );
	assert_eq!( config.name, "isolated" );
	assert_eq!( config.extensions, [ "wasm", "wat" ]);
	assert_eq!( config.strategy, LoadStrategy::Bytes );
	assert!( config.include_host_paths );
	assert_eq!( config.shadow_directory, None );

}

#[test]
fn toml_overrides_every_field() {

	let config = IsolationConfig::from_toml_str( r#"
		name = "providers"
		search_paths = [ "/opt/providers", "/usr/lib/providers" ]
		extensions = [ "wasm" ]
		strategy = "locked"
		include_host_paths = false
		shadow_directory = "/var/cache/providers"
	"# ).unwrap();

	assert_eq!( config, IsolationConfig::new( "providers" )
		.with_search_path( "/opt/providers" )
		.with_search_path( "/usr/lib/providers" )
		.with_extensions([ "wasm" ])
		.with_strategy( LoadStrategy::Locked )
		.with_host_paths( false )
		.with_shadow_directory( "/var/cache/providers" )
	);

}

#[test]
fn invalid_toml_is_rejected() {

	match IsolationConfig::from_toml_str( "unknown_key = 1" ) {
		Err( ConfigError::Toml( _ )) => {}
		value => panic!( "Expected Err( Toml( .. )), found: {:#?}", value ),
	}
	match IsolationConfig::from_toml_str( r#"strategy = "teleport""# ) {
		Err( ConfigError::Toml( _ )) => {}
		value => panic!( "Expected Err( Toml( .. )), found: {:#?}", value ),
	}
	match IsolationConfig::from_toml_str( "extensions = []" ) {
		Err( ConfigError::NoExtensions ) => {}
		value => panic!( "Expected Err( NoExtensions ), found: {:#?}", value ),
	}

}

#[test]
fn config_is_read_from_file() {

	let dir = tempfile::tempdir().unwrap();
	let path = fixtures::write_unit( dir.path(), "isolation.toml", r#"strategy = "shadow-copy""# );

	let config = IsolationConfig::from_file( &path ).unwrap();
	assert_eq!( config.strategy, LoadStrategy::ShadowCopy );

	match IsolationConfig::from_file( dir.path().join( "missing.toml" )) {
		Err( ConfigError::Io( _ )) => {}
		value => panic!( "Expected Err( Io( .. )), found: {:#?}", value ),
	}

}

#[test]
fn context_needs_an_extension() {

	let host = fixtures::host();

	match host.create_context( &IsolationConfig::new( "bare" ).with_extensions( Vec::<String>::new() )) {
		Err( IsolationError::Config( ConfigError::NoExtensions )) => {}
		value => panic!( "Expected Err( Config( NoExtensions )), found: {:#?}", value ),
	}

}

#[test]
fn contexts_get_names() {

	let host = fixtures::host();

	let named = host.create_context( &IsolationConfig::new( "providers" )).unwrap();
	assert_eq!( named.name(), "providers" );

	let anonymous = host.create_isolated_context( Vec::<PathBuf>::new() ).unwrap();
	assert!( anonymous.name().starts_with( "isolated-" ), "{}", anonymous.name() );

}

#[test]
fn host_paths_come_from_the_running_binary() {

	let host = IsolationHost::new( Arc::new( AdaptationEngine::new() ));
	let exe_dir = std::env::current_exe().unwrap().parent().unwrap().to_path_buf();
	assert_eq!( host.base_paths(), [ exe_dir.clone() ]);

	let with_host = host.create_context( &IsolationConfig::new( "with-host" )).unwrap();
	assert!( with_host.search_paths().contains( &exe_dir ));

	let without_host = host.create_context( &IsolationConfig::new( "without-host" ).with_host_paths( false )).unwrap();
	assert!( without_host.search_paths().is_empty() );

}
