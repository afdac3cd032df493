//! Resolution of contract operations to candidate members.
//!
//! A [`BindingSet`] records, for every operation of a contract, which candidate
//! member implements it. Resolution is deterministic: candidates are searched in
//! caller order, and within a candidate its methods over all surfaces come before
//! its delegate members. Only the shapes of the candidates decide the outcome, so a
//! binding set is resolved once per shape and reused for every later adaptation of
//! candidates with the same shape.

use std::sync::Arc ;
use itertools::Itertools ;
use pipe_trait::Pipe ;

use crate::candidate::{ Candidate, Delegate, DelegateGetter, MethodFn };
use crate::contract::{ Contract, Operation, Signature };
use crate::inspector ;



/// How a single operation is implemented.
#[derive( Clone )]
pub enum Binding {
	/// A method member of the instance stored in `slot`.
	Method {
		slot: usize,
		owner: String,
		surface: String,
		member: String,
		signature: Signature,
		call: MethodFn,
	},
	/// A delegate value captured from a field or property, stored at `index`.
	Delegate {
		index: usize,
		owner: String,
		member: String,
		signature: Signature,
	},
	/// Nothing implements the operation; it is stubbed.
	Unbound,
}

impl Binding {

	#[inline] pub fn is_bound( &self ) -> bool { !matches!( self, Self::Unbound ) }

	fn descriptor( &self ) -> String {
		match self {
			Self::Method { slot, owner, surface, member, signature, .. } =>
				format!( "#{}:{}/{}.{}({})", slot, owner, surface, member, signature ),
			Self::Delegate { index, owner, member, signature } =>
				format!( "delegate#{}:{}.{}({})", index, owner, member, signature ),
			Self::Unbound => "stub".to_string(),
		}
	}
}

impl std::fmt::Debug for Binding {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		write!( f, "{}", self.descriptor() )
	}
}

#[derive( Clone )]
struct DelegateSource {
	candidate: usize,
	getter: DelegateGetter,
}

/// The resolved bindings of one contract against one candidate list.
#[derive( Clone )]
pub struct BindingSet {
	contract: Arc<Contract>,
	bindings: Vec<Binding>,
	/// Candidate position backing each slot.
	slots: Vec<usize>,
	delegates: Vec<DelegateSource>,
}

impl BindingSet {

	/// Resolves every operation of `contract` against `instances`.
	///
	/// Each distinct bound instance occupies one slot, instances passed more than
	/// once share it. Each bound delegate occupies one delegate index.
	pub fn resolve( contract: &Arc<Contract>, instances: &[Arc<dyn Candidate>] ) -> Self {

		let mut slots: Vec<usize> = Vec::new();
		let mut delegates: Vec<DelegateSource> = Vec::new();

		let bindings = contract.operations().iter()
			.map(| operation | {
				for ( position, instance ) in instances.iter().enumerate() {
					if inspector::denies( instance.as_ref(), operation ) { continue }
					let ty = instance.candidate_type();

					if let Some(( surface, method )) = inspector::find_method( &ty, operation ) {
						let slot = slot_of( &mut slots, instances, position );
						return Binding::Method {
							slot,
							owner: ty.identity().to_string(),
							surface: surface.name().to_string(),
							member: method.name().to_string(),
							signature: method.signature().clone(),
							call: Arc::clone( &method.call ),
						};
					}

					if let Some(( member, _ )) = inspector::find_delegate( &ty, instance.as_ref(), operation ) {
						delegates.push( DelegateSource { candidate: position, getter: Arc::clone( &member.getter ) });
						return Binding::Delegate {
							index: delegates.len() - 1,
							owner: ty.identity().to_string(),
							member: member.name().to_string(),
							signature: member.signature().clone(),
						};
					}
				}
				Binding::Unbound
			})
			.collect();

		Self { contract: Arc::clone( contract ), bindings, slots, delegates }

	}

	#[inline] pub fn contract( &self ) -> &Arc<Contract> { &self.contract }
	#[inline] pub fn bindings( &self ) -> &[Binding] { &self.bindings }
	#[inline] pub fn slot_count( &self ) -> usize { self.slots.len() }
	#[inline] pub fn delegate_count( &self ) -> usize { self.delegates.len() }

	/// Operations paired with their bindings, in contract order.
	pub fn iter( &self ) -> impl Iterator<Item = ( &Operation, &Binding )> {
		self.contract.operations().iter().zip( self.bindings.iter() )
	}

	/// Required operations left unbound.
	pub fn missing_required( &self ) -> Vec<&Operation> {
		self.iter()
			.filter(|( operation, binding )| operation.required && !binding.is_bound() )
			.map(|( operation, _ )| operation )
			.collect()
	}

	/// Structural key of the resolved bindings. Two binding sets with the same key
	/// can share one proxy definition.
	pub fn signature( &self ) -> String {
		self.iter()
			.map(|( operation, binding )| format!( "{}=>{}", operation.name, binding.descriptor() ))
			.join( " | " )
			.pipe(| body | format!( "{}::{}", self.contract.identity(), body ))
	}

	/// Collects the slot instances and delegate values for `instances`, which must
	/// have the shape this set was resolved against.
	///
	/// Returns `None` if a delegate member no longer holds a value.
	pub fn bind( &self, instances: &[Arc<dyn Candidate>] ) -> Option<( Vec<Arc<dyn Candidate>>, Vec<Delegate> )> {
		let slot_instances = self.slots.iter()
			.map(| position | instances.get( *position ).cloned() )
			.collect::<Option<Vec<_>>>()?;
		let delegate_values = self.delegates.iter()
			.map(| source | instances.get( source.candidate ).and_then(| instance | ( source.getter )( instance.as_ref() )))
			.collect::<Option<Vec<_>>>()?;
		Some(( slot_instances, delegate_values ))
	}
}

impl std::fmt::Debug for BindingSet {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "BindingSet" )
			.field( "contract", &self.contract.name() )
			.field( "bindings", &self.bindings )
			.field( "slots", &self.slots )
			.finish_non_exhaustive()
	}
}

fn slot_of( slots: &mut Vec<usize>, instances: &[Arc<dyn Candidate>], position: usize ) -> usize {
	let target = Arc::as_ptr( &instances[position] );
	match slots.iter().position(| occupied | std::ptr::addr_eq( Arc::as_ptr( &instances[*occupied] ), target )) {
		Some( slot ) => slot,
		None => {
			slots.push( position );
			slots.len() - 1
		}
	}
}
