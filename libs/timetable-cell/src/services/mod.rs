pub mod store;
pub mod supabase_store;
pub mod timetable;

pub use store::{InMemoryTimetableRepository, TimetableRepository};
pub use supabase_store::SupabaseTimetableRepository;
pub use timetable::TimetableService;
