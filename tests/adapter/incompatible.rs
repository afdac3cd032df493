use std::sync::Arc ;
use provider_link::{ AdaptError, AdaptationEngine, CandidateRef, DelegateSet, IncompatibleContractError, ValueType };

use crate::fixtures::{ self, DOG, ENGLISH_SPEAKER, MUTE };

fn incompatible( result: Result<Arc<dyn provider_link::Adapter>, AdaptError> ) -> IncompatibleContractError {
	match result {
		Err( AdaptError::Incompatible( err )) => err,
		Err( err ) => panic!( "Expected Err( Incompatible( .. )), found: {:#?}", err ),
		Ok( _ ) => panic!( "Expected Err( Incompatible( .. )), found an adapter" ),
	}
}

#[test]
fn missing_required_operation_is_listed() {

	let engine = AdaptationEngine::new();
	let err = incompatible( engine.create_adapter( &fixtures::greeter(), &[ CandidateRef::Type( Arc::clone( &DOG ))]));

	assert_eq!( err.contract, "Greeter" );
	assert_eq!( err.candidates, [ "Dog" ]);
	assert_eq!( err.missing_operations, [ "SayHello" ]);
	assert_eq!( err.missing_signatures, [ "string SayHello()" ]);
	assert!( err.types_lacking_default_constructor.is_empty() );

	let message = err.to_string();
	assert!( message.contains( "Candidates ('Dog') are incompatible with contract 'Greeter'" ), "{}", message );
	assert!( message.contains( "'string SayHello()'" ), "{}", message );

}

#[test]
fn types_without_constructor_are_listed() {

	let engine = AdaptationEngine::new();
	let err = incompatible( engine.create_adapter( &fixtures::greeter(), &[
		CandidateRef::Type( Arc::clone( &MUTE )),
		CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER )),
	]));

	assert_eq!( err.candidates, [ "Mute", "EnglishSpeaker" ]);
	assert_eq!( err.types_lacking_default_constructor, [ "Mute" ]);
	assert!( err.missing_operations.is_empty() );
	assert!( err.to_string().contains( "Types ('Mute') do not support a default constructor" ));

}

#[test]
fn null_delegate_leaves_operation_missing() {

	let engine = AdaptationEngine::new();
	let set = DelegateSet::builder()
		.maybe( "SayHello", [], ValueType::String, None )
		.build();

	let err = incompatible( engine.create_adapter( &fixtures::greeter(), &[ CandidateRef::instance( set )]));

	assert_eq!( err.missing_operations, [ "SayHello" ]);
	assert_eq!( engine.stats().proxy_definitions, 0 );

}

#[test]
fn every_missing_operation_is_listed() {

	let engine = AdaptationEngine::new();
	let err = incompatible( engine.create_adapter( &fixtures::host_of_ceremonies(), &[ CandidateRef::Type( Arc::clone( &DOG ))]));

	assert_eq!( err.missing_operations, [ "SayHello", "SayGoodbye" ]);
	assert_eq!( err.missing_signatures, [ "string SayHello()", "string SayGoodbye(string)" ]);

}
