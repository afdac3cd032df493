use std::sync::Arc ;
use provider_link::{ AdaptationEngine, Adapter, Candidate, CandidateRef, Contract, Value, ValueType };

use crate::fixtures::{ self, NativeGreeter, ENGLISH_SPEAKER };

#[test]
fn native_implementer_is_returned_unchanged() {

	let native = Arc::new( NativeGreeter );
	let engine = AdaptationEngine::new();

	let adapter = engine.create_adapter( &fixtures::greeter(), &[ CandidateRef::Instance( Arc::clone( &native ) as Arc<dyn Candidate> )]).unwrap();

	assert!( std::ptr::addr_eq( Arc::as_ptr( &adapter ), Arc::as_ptr( &native )));
	assert_eq!( adapter.invoke( "SayHello", &[] ).unwrap(), Value::from( "Native hello" ));
	assert_eq!( engine.stats().proxy_definitions, 0 );
	assert_eq!( engine.stats().structural_scans, 0 );

}

#[test]
fn native_implementer_of_another_contract_is_proxied() {

	let engine = AdaptationEngine::new();
	let salutation = Contract::builder( "Salutation" )
		.required( "SayHello", [], ValueType::String )
		.build()
		.unwrap();

	let adapter = engine.create_adapter( &salutation, &[ CandidateRef::instance( NativeGreeter )]).unwrap();

	assert_eq!( adapter.invoke( "SayHello", &[] ).unwrap(), Value::from( "Native hello" ));
	assert_eq!( engine.stats().proxy_definitions, 1 );

}

#[test]
fn shortcut_only_applies_to_a_lone_instance() {

	let native: Arc<dyn Candidate> = Arc::new( NativeGreeter );
	let engine = AdaptationEngine::new();

	let adapter = engine.create_adapter( &fixtures::greeter(), &[
		CandidateRef::Instance( Arc::clone( &native )),
		CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER )),
	]).unwrap();

	assert!( !std::ptr::addr_eq( Arc::as_ptr( &adapter ), Arc::as_ptr( &native )));
	assert_eq!( adapter.invoke( "SayHello", &[] ).unwrap(), Value::from( "Native hello" ));
	assert_eq!( engine.stats().proxy_definitions, 1 );

}
