mod poller;

pub use poller::{PollSummary, VacancyPoller, VacancySource};
