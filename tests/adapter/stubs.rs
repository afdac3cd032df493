use std::sync::Arc ;
use provider_link::{ AdaptationEngine, Adapter, Candidate, CandidateRef, Contract, ProxyCallError, Value, ValueType };

use crate::fixtures::{ self, Tally, ENGLISH_SPEAKER };

#[test]
fn unimplemented_optional_operations_return_defaults() {

	let contract = Contract::builder( "Defaults" )
		.required( "SayHello", [], ValueType::String )
		.optional( "Name", [], ValueType::String )
		.optional( "Count", [], ValueType::S32 )
		.optional( "Total", [], ValueType::U64 )
		.optional( "Ratio", [], ValueType::F64 )
		.optional( "Ready", [], ValueType::Bool )
		.optional( "Items", [], ValueType::list( ValueType::String ))
		.optional( "Reset", [], ValueType::Unit )
		.build()
		.unwrap();

	let engine = AdaptationEngine::new();
	let adapter = engine.create_adapter( &contract, &[ CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER ))]).unwrap();

	assert_eq!( adapter.invoke( "Name", &[] ).unwrap(), Value::Null );
	assert_eq!( adapter.invoke( "Count", &[] ).unwrap(), Value::S32( 0 ));
	assert_eq!( adapter.invoke( "Total", &[] ).unwrap(), Value::U64( 0 ));
	assert_eq!( adapter.invoke( "Ratio", &[] ).unwrap(), Value::F64( 0.0 ));
	assert_eq!( adapter.invoke( "Ready", &[] ).unwrap(), Value::Bool( false ));
	assert_eq!( adapter.invoke( "Items", &[] ).unwrap(), Value::Null );
	assert_eq!( adapter.invoke( "Reset", &[] ).unwrap(), Value::Unit );

}

#[test]
fn implementation_is_reported_per_operation() {

	let engine = AdaptationEngine::new();
	let adapter = engine.create_adapter( &fixtures::greeter(), &[ CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER ))]).unwrap();

	assert_eq!( adapter.contract_name(), "Greeter" );
	assert!( adapter.is_operation_implemented( "SayHello" ));
	assert!( adapter.is_operation_implemented( "sayhello" ));
	assert!( !adapter.is_operation_implemented( "SayGoodbye" ));
	assert!( !adapter.is_operation_implemented( "CountGreetings" ));
	assert!( !adapter.is_operation_implemented( "Fly" ));

}

#[test]
fn stubs_have_no_side_effects() {

	let tally = Arc::new( Tally::default() );
	let engine = AdaptationEngine::new();
	let adapter = engine.create_adapter( &fixtures::greeter(), &[ CandidateRef::Instance( Arc::clone( &tally ) as Arc<dyn Candidate> )]).unwrap();

	assert_eq!( adapter.invoke( "SayHello", &[] ).unwrap(), Value::from( "Hello" ));
	assert_eq!( adapter.invoke( "SayGoodbye", &[ "Bob".into() ]).unwrap(), Value::Null );
	assert_eq!( adapter.invoke( "CountGreetings", &[] ).unwrap(), Value::S32( 0 ));
	assert_eq!( adapter.invoke( "SayHello", &[] ).unwrap(), Value::from( "Hello" ));

	assert_eq!( tally.count(), 2 );

}

#[test]
fn stubs_still_check_arguments() {

	let engine = AdaptationEngine::new();
	let adapter = engine.create_adapter( &fixtures::greeter(), &[ CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER ))]).unwrap();

	let err = adapter.invoke( "SayGoodbye", &[] ).unwrap_err();
	match err.downcast_ref::<ProxyCallError>() {
		Some( ProxyCallError::ArgumentCount { expected: 1, found: 0, .. }) => {}
		value => panic!( "Expected Some( ArgumentCount {{ expected: 1, found: 0, .. }}), found: {:#?}", value ),
	}

}
