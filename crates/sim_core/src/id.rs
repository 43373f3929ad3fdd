use crate::{Counters, ModuleInstanceId};
use rand::Rng;
use uuid::Uuid;

/// Session id drawn from the seeded RNG, so a replayed seed reproduces it.
pub fn generate_session_id(rng: &mut impl Rng) -> Uuid {
    let bytes: [u8; 16] = rng.gen();
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

/// `module_inst_NNNN`. The counter survives resets so ids are never reused
/// within a session.
pub(crate) fn next_module_instance_id(counters: &mut Counters) -> ModuleInstanceId {
    let id = ModuleInstanceId(format!(
        "module_inst_{:04}",
        counters.next_module_instance_id
    ));
    counters.next_module_instance_id += 1;
    id
}
