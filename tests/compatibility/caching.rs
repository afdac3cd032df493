use std::sync::Arc ;
use provider_link::{ AdaptError, AdaptationEngine, Adapter, Candidate, CandidateRef, Contract, DelegateSet, ValueType, delegate };

use crate::fixtures::{ self, EnglishSpeaker, ENGLISH_SPEAKER };

macro_rules! provider_module {
	( $module:ident, $greeting:literal ) => {
		mod $module {
			use std::sync::Arc ;
			use once_cell::sync::Lazy ;
			use provider_link::{ Candidate, CandidateType, ValueType };

			pub struct Provider ;

			pub static PROVIDER: Lazy<Arc<CandidateType>> = Lazy::new(|| CandidateType::builder::<Provider>()
				.constructor(|| Provider )
				.method( "SayHello", [], ValueType::String, | _, _ | Ok( $greeting.into() ))
				.build()
			);

			impl Candidate for Provider {
				fn candidate_type( &self ) -> Arc<CandidateType> { Arc::clone( &PROVIDER ) }
			}
		}
	};
}

provider_module!( north, "from north" );
provider_module!( south, "from south" );

fn dancer( dance_required: bool ) -> Arc<Contract> {
	let builder = Contract::builder( "Greeter" ).required( "SayHello", [], ValueType::String );
	let builder = match dance_required {
		true => builder.required( "Dance", [], ValueType::U32 ),
		false => builder.optional( "Dance", [], ValueType::U32 ),
	};
	builder.build().unwrap()
}

fn hello_set( greeting: &'static str ) -> DelegateSet {
	DelegateSet::builder()
		.with( "SayHello", [], ValueType::String, delegate( move | _ | Ok( greeting.into() )))
		.build()
}

#[test]
fn repeated_query_is_answered_from_cache() {

	let engine = AdaptationEngine::new();
	let greeter = fixtures::greeter();
	let candidates = [ CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER ))];

	assert_eq!( engine.is_compatible( &greeter, &candidates ), Ok( true ));
	assert_eq!( engine.stats().structural_scans, 1 );

	assert_eq!( engine.is_compatible( &greeter, &candidates ), Ok( true ));
	assert_eq!( engine.is_type_compatible( &greeter, &[ Arc::clone( &ENGLISH_SPEAKER )]), Ok( true ));
	assert_eq!( engine.stats().structural_scans, 1 );
	assert_eq!( engine.stats().compatibility_entries, 1 );

}

#[test]
fn negative_answers_are_cached_too() {

	let engine = AdaptationEngine::new();
	let contract = fixtures::host_of_ceremonies();

	assert_eq!( engine.is_type_compatible( &contract, &[ Arc::clone( &ENGLISH_SPEAKER )]), Ok( false ));
	assert_eq!( engine.is_type_compatible( &contract, &[ Arc::clone( &ENGLISH_SPEAKER )]), Ok( false ));
	assert_eq!( engine.stats().structural_scans, 1 );

}

#[test]
fn answers_are_kept_per_contract() {

	let engine = AdaptationEngine::new();

	engine.is_type_compatible( &fixtures::greeter(), &[ Arc::clone( &ENGLISH_SPEAKER )]).unwrap();
	engine.is_type_compatible( &fixtures::host_of_ceremonies(), &[ Arc::clone( &ENGLISH_SPEAKER )]).unwrap();

	assert_eq!( engine.stats().structural_scans, 2 );
	assert_eq!( engine.stats().compatibility_entries, 2 );

}

#[test]
fn instances_of_the_same_shape_share_an_answer() {

	let engine = AdaptationEngine::new();
	let greeter = fixtures::greeter();

	assert_eq!( engine.is_compatible( &greeter, &[ CandidateRef::instance( hello_set( "Hi" ))]), Ok( true ));
	assert_eq!( engine.is_compatible( &greeter, &[ CandidateRef::instance( hello_set( "Howdy" ))]), Ok( true ));

	assert_eq!( engine.stats().structural_scans, 1 );

}

#[test]
fn delegate_presence_is_part_of_the_shape() {

	let engine = AdaptationEngine::new();
	let greeter = fixtures::greeter();
	let absent = DelegateSet::builder().maybe( "SayHello", [], ValueType::String, None ).build();

	assert_eq!( engine.is_compatible( &greeter, &[ CandidateRef::instance( hello_set( "Hi" ))]), Ok( true ));
	assert_eq!( engine.is_compatible( &greeter, &[ CandidateRef::instance( absent )]), Ok( false ));

	assert_eq!( engine.stats().structural_scans, 2 );
	assert_eq!( engine.stats().compatibility_entries, 2 );

}

#[test]
fn repeated_adaptation_does_no_structural_work() {

	let engine = AdaptationEngine::new();
	let greeter = fixtures::greeter();
	let candidates = [ CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER ))];

	engine.create_adapter( &greeter, &candidates ).unwrap();
	let first = engine.stats();
	assert_eq!( first.proxy_definitions, 1 );
	assert_eq!( first.binding_plans, 1 );

	let adapter = engine.create_adapter( &greeter, &candidates ).unwrap();
	assert_eq!( adapter.invoke( "SayHello", &[] ).unwrap().as_str(), Some( "Hello" ));
	assert_eq!( engine.stats(), first );

	// Instances of the adapted type hit the entry the adaptation stored.
	let instance: Arc<dyn Candidate> = Arc::new( EnglishSpeaker );
	assert_eq!( engine.is_instance_compatible( &greeter, &[ instance ]), Ok( true ));
	assert_eq!( engine.stats(), first );

}

#[test]
fn concurrent_adaptation_creates_one_definition() {

	let engine = AdaptationEngine::new();
	let greeter = fixtures::greeter();

	std::thread::scope(| scope | {
		for _ in 0..8 {
			scope.spawn(|| {
				let adapter = engine.create_adapter( &greeter, &[ CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER ))]).unwrap();
				assert_eq!( adapter.invoke( "SayHello", &[] ).unwrap().as_str(), Some( "Hello" ));
			});
		}
	});

	assert_eq!( engine.stats().proxy_definitions, 1 );
	assert_eq!( engine.stats().binding_plans, 1 );
	assert_eq!( engine.stats().compatibility_entries, 1 );

}

#[test]
fn same_named_contracts_are_kept_apart() {

	let engine = AdaptationEngine::new();
	let relaxed = dancer( false );
	let strict = dancer( true );
	let candidates = [ CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER ))];
	assert_ne!( relaxed.identity(), strict.identity() );

	let adapter = engine.create_adapter( &relaxed, &candidates ).unwrap();
	assert!( !adapter.is_operation_implemented( "Dance" ));

	assert_eq!( engine.is_compatible( &strict, &candidates ), Ok( false ));
	match engine.create_adapter( &strict, &candidates ) {
		Err( AdaptError::Incompatible( err )) => assert_eq!( err.missing_operations, [ "Dance" ]),
		Err( err ) => panic!( "Expected Err( Incompatible( .. )), found: {:#?}", err ),
		Ok( _ ) => panic!( "Expected Err( Incompatible( .. )), found an adapter" ),
	}

	// A proxy for one contract is not a native implementation of its namesake.
	let chained = [ CandidateRef::Instance( adapter.into_candidate().unwrap() )];
	match engine.create_adapter( &strict, &chained ) {
		Err( AdaptError::Incompatible( err )) => assert_eq!( err.missing_operations, [ "Dance" ]),
		Err( err ) => panic!( "Expected Err( Incompatible( .. )), found: {:#?}", err ),
		Ok( _ ) => panic!( "Expected Err( Incompatible( .. )), found an adapter" ),
	}

}

#[test]
fn equal_contracts_built_twice_share_entries() {

	let engine = AdaptationEngine::new();
	let candidates = [ CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER ))];

	engine.create_adapter( &dancer( false ), &candidates ).unwrap();
	let first = engine.stats();
	engine.create_adapter( &dancer( false ), &candidates ).unwrap();

	assert_eq!( engine.stats(), first );

}

#[test]
fn same_named_types_from_different_modules_are_kept_apart() {

	let engine = AdaptationEngine::new();
	let greeter = fixtures::greeter();
	assert_eq!( north::PROVIDER.name(), south::PROVIDER.name() );
	assert_ne!( north::PROVIDER.identity(), south::PROVIDER.identity() );

	let from_north = engine.create_adapter( &greeter, &[ CandidateRef::Type( Arc::clone( &north::PROVIDER ))]).unwrap();
	let from_south = engine.create_adapter( &greeter, &[ CandidateRef::Type( Arc::clone( &south::PROVIDER ))]).unwrap();

	assert_eq!( from_north.invoke( "SayHello", &[] ).unwrap().as_str(), Some( "from north" ));
	assert_eq!( from_south.invoke( "SayHello", &[] ).unwrap().as_str(), Some( "from south" ));
	assert_eq!( engine.stats().proxy_definitions, 2 );

}
