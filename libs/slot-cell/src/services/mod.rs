pub mod allocator;
pub mod availability;
pub mod commitments;
pub mod directory;
pub mod generator;
pub mod regeneration;
pub mod store;
pub mod supabase_store;

pub use allocator::BookingAllocator;
pub use availability::AvailabilityResolver;
pub use commitments::DoctorCommitments;
pub use directory::{ClinicDoctor, DoctorDirectory, InMemoryDoctorDirectory, SupabaseDoctorDirectory};
pub use generator::SlotGenerator;
pub use regeneration::RegenerationCoordinator;
pub use store::{InMemorySlotRepository, InsertOutcome, SlotRepository};
pub use supabase_store::SupabaseSlotRepository;
