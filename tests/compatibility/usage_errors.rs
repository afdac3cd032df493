use std::sync::Arc ;
use provider_link::{ AdaptError, AdaptationEngine, CandidateRef, Contract, UsageError, ValueType };

use crate::fixtures::{ self, ENGLISH_SPEAKER };

#[test]
fn contract_without_operations_is_rejected() {

	let engine = AdaptationEngine::new();
	let empty = Contract::builder( "Empty" ).build().unwrap();
	let candidates = [ CandidateRef::Type( Arc::clone( &ENGLISH_SPEAKER ))];

	match engine.is_compatible( &empty, &candidates ) {
		Err( UsageError::ContractHasNoOperations( name )) if name == "Empty" => {}
		value => panic!( "Expected Err( ContractHasNoOperations( \"Empty\" )), found: {:#?}", value ),
	}

	match engine.create_adapter( &empty, &candidates ) {
		Err( AdaptError::Usage( UsageError::ContractHasNoOperations( _ ))) => {}
		Err( err ) => panic!( "Expected Err( Usage( ContractHasNoOperations( .. ))), found: {:#?}", err ),
		Ok( _ ) => panic!( "Expected Err( Usage( ContractHasNoOperations( .. ))), found an adapter" ),
	}

	assert!( engine.filter_compatible_types( &empty, &[ Arc::clone( &ENGLISH_SPEAKER )]).is_err() );
	assert!( engine.is_type_compatible( &empty, &[ Arc::clone( &ENGLISH_SPEAKER )]).is_err() );

}

#[test]
fn empty_candidate_list_is_rejected() {

	let engine = AdaptationEngine::new();
	let greeter = fixtures::greeter();

	assert_eq!( engine.is_compatible( &greeter, &[] ), Err( UsageError::NoCandidates ));
	assert_eq!( engine.is_type_compatible( &greeter, &[] ), Err( UsageError::NoCandidates ));
	assert_eq!( engine.is_instance_compatible( &greeter, &[] ), Err( UsageError::NoCandidates ));

	match engine.create_adapter( &greeter, &[] ) {
		Err( AdaptError::Usage( UsageError::NoCandidates )) => {}
		Err( err ) => panic!( "Expected Err( Usage( NoCandidates )), found: {:#?}", err ),
		Ok( _ ) => panic!( "Expected Err( Usage( NoCandidates )), found an adapter" ),
	}

	assert_eq!( engine.stats().structural_scans, 0 );

}

#[test]
fn duplicate_operation_names_are_rejected() {

	let result = Contract::builder( "Echo" )
		.required( "Ping", [], ValueType::Unit )
		.optional( "PING", [ ValueType::String ], ValueType::Unit )
		.build();

	match result {
		Err( UsageError::DuplicateOperation { contract, operation }) => {
			assert_eq!( contract, "Echo" );
			assert_eq!( operation, "PING" );
		}
		value => panic!( "Expected Err( DuplicateOperation {{ .. }}), found: {:#?}", value ),
	}

}
