pub mod booking;
pub mod commitments;
pub mod store;
pub mod supabase_store;

pub use booking::AppointmentBookingService;
pub use commitments::AppointmentCommitments;
pub use store::{AppointmentRepository, InMemoryAppointmentRepository};
pub use supabase_store::SupabaseAppointmentRepository;
