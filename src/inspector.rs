//! Structural matching of contract operations against candidate members.

use std::sync::Arc ;

use crate::candidate::{ Candidate, CandidateType, Delegate, DelegateMember, MethodMember, Surface };
use crate::contract::{ Contract, Operation, Signature };



/// Operation and member names match ignoring ASCII case.
#[inline]
pub fn names_match( operation: &str, member: &str ) -> bool { operation.eq_ignore_ascii_case( member ) }

/// Parameters must be identical; the member's return type must be assignable to the operation's.
pub fn signature_matches( operation: &Operation, member: &Signature ) -> bool {
	operation.params == member.params && operation.returns.accepts( &member.returns )
}

/// First method member, over all surfaces in order, that implements `operation`.
pub fn find_method<'a>( ty: &'a CandidateType, operation: &Operation ) -> Option<( &'a Surface, &'a MethodMember )> {
	ty.methods().find(|( _, method )| names_match( &operation.name, &method.name ) && signature_matches( operation, &method.signature ))
}

/// First delegate member, over all surfaces in order, that implements `operation`
/// and currently holds a value on `instance`.
pub fn find_delegate<'a>(
	ty: &'a CandidateType,
	instance: &dyn Candidate,
	operation: &Operation,
) -> Option<( &'a DelegateMember, Delegate )> {
	ty.delegates()
		.filter(|( _, member )| names_match( &operation.name, &member.name ) && signature_matches( operation, &member.signature ))
		.find_map(|( _, member )| ( member.getter )( instance ).map(| delegate | ( member, delegate )))
}

/// Whether the instance's support marker withholds `operation`.
#[inline]
pub fn denies( instance: &dyn Candidate, operation: &Operation ) -> bool {
	instance.supports_operation( &operation.name ) == Some( false )
}

/// Required operations that no type provides a method for.
pub fn missing_from_types<'a>( contract: &'a Contract, types: &[Arc<CandidateType>] ) -> Vec<&'a Operation> {
	contract.required_operations()
		.filter(| operation | !types.iter().any(| ty | find_method( ty, operation ).is_some() ))
		.collect()
}

/// Required operations that no instance provides, either by a method or by a
/// non-null delegate member, honoring each instance's support marker.
pub fn missing_from_instances<'a>( contract: &'a Contract, instances: &[Arc<dyn Candidate>] ) -> Vec<&'a Operation> {
	contract.required_operations()
		.filter(| operation | !instances.iter().any(| instance | provides( instance.as_ref(), operation )))
		.collect()
}

fn provides( instance: &dyn Candidate, operation: &Operation ) -> bool {
	if denies( instance, operation ) { return false }
	let ty = instance.candidate_type();
	find_method( &ty, operation ).is_some() || find_delegate( &ty, instance, operation ).is_some()
}

/// Names of the types that cannot be instantiated.
pub fn lacking_constructor( types: &[Arc<CandidateType>] ) -> Vec<String> {
	types.iter()
		.filter(| ty | !ty.has_constructor() )
		.map(| ty | ty.name().to_string() )
		.collect()
}
