use crate::schedule::ScheduleService;
use crate::store::Store;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub schedule: Arc<ScheduleService>,
}

impl AppState {
    pub fn new(store: Store, schedule: ScheduleService) -> Self {
        Self {
            store,
            schedule: Arc::new(schedule),
        }
    }
}
