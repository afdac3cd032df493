use std::sync::Arc ;
use provider_link::{ AdaptationEngine, CandidateRef, Contract, ValueType };

use crate::fixtures::{ self, CALLBACKS, DOG, ENGLISH_SPEAKER, FAREWELL, FRENCH_SPEAKER, MUTE };

#[test]
fn type_with_matching_method_is_compatible() {

	let engine = AdaptationEngine::new();

	match engine.is_type_compatible( &fixtures::greeter(), &[ Arc::clone( &ENGLISH_SPEAKER )]) {
		Ok( true ) => {}
		value => panic!( "Expected Ok( true ), found: {:#?}", value ),
	}

}

#[test]
fn type_missing_required_operation_is_incompatible() {

	let engine = AdaptationEngine::new();
	let greeter = fixtures::greeter();

	assert_eq!( engine.is_type_compatible( &greeter, &[ Arc::clone( &DOG )]), Ok( false ));
	assert_eq!( engine.is_compatible( &greeter, &[ CandidateRef::Type( Arc::clone( &DOG ))]), Ok( false ));

}

#[test]
fn type_without_constructor_is_incompatible() {

	let engine = AdaptationEngine::new();
	assert_eq!( engine.is_type_compatible( &fixtures::greeter(), &[ Arc::clone( &MUTE )]), Ok( false ));

}

#[test]
fn names_match_ignoring_case() {

	let engine = AdaptationEngine::new();
	let shouting = Contract::builder( "ShoutingGreeter" )
		.required( "SAYHELLO", [], ValueType::String )
		.build()
		.unwrap();

	assert_eq!( engine.is_type_compatible( &shouting, &[ Arc::clone( &ENGLISH_SPEAKER )]), Ok( true ));

}

#[test]
fn parameters_must_match_exactly() {

	let engine = AdaptationEngine::new();
	let personal = Contract::builder( "PersonalGreeter" )
		.required( "SayHello", [ ValueType::String ], ValueType::String )
		.build()
		.unwrap();

	assert_eq!( engine.is_type_compatible( &personal, &[ Arc::clone( &ENGLISH_SPEAKER )]), Ok( false ));

}

#[test]
fn return_type_must_be_assignable() {

	let engine = AdaptationEngine::new();
	let loose = Contract::builder( "LooseGreeter" )
		.required( "SayHello", [], ValueType::Any )
		.build()
		.unwrap();
	let numeric = Contract::builder( "NumericGreeter" )
		.required( "SayHello", [], ValueType::S32 )
		.build()
		.unwrap();

	assert_eq!( engine.is_type_compatible( &loose, &[ Arc::clone( &ENGLISH_SPEAKER )]), Ok( true ));
	assert_eq!( engine.is_type_compatible( &numeric, &[ Arc::clone( &ENGLISH_SPEAKER )]), Ok( false ));

}

#[test]
fn types_together_cover_contract() {

	let engine = AdaptationEngine::new();
	let contract = fixtures::host_of_ceremonies();

	assert_eq!( engine.is_type_compatible( &contract, &[ Arc::clone( &ENGLISH_SPEAKER )]), Ok( false ));
	assert_eq!( engine.is_type_compatible( &contract, &[ Arc::clone( &FAREWELL )]), Ok( false ));
	assert_eq!( engine.is_type_compatible( &contract, &[ Arc::clone( &ENGLISH_SPEAKER ), Arc::clone( &FAREWELL )]), Ok( true ));

}

#[test]
fn delegate_members_do_not_count_for_types() {

	let engine = AdaptationEngine::new();
	assert_eq!( engine.is_type_compatible( &fixtures::greeter(), &[ Arc::clone( &CALLBACKS )]), Ok( false ));

}

#[test]
fn filter_keeps_compatible_types_in_order() {

	let engine = AdaptationEngine::new();
	let types = [
		Arc::clone( &DOG ),
		Arc::clone( &FRENCH_SPEAKER ),
		Arc::clone( &MUTE ),
		Arc::clone( &ENGLISH_SPEAKER ),
	];

	let compatible = engine.filter_compatible_types( &fixtures::greeter(), &types ).unwrap();
	let names = compatible.iter().map(| ty | ty.name() ).collect::<Vec<_>>();
	assert_eq!( names, [ "FrenchSpeaker", "EnglishSpeaker" ]);

}
