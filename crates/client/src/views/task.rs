//! Running task tray

use super::{Revision, View, ViewContext};
use crate::router::Receiver;
use airshipui_common::{
    component, sub, Channel, Envelope, RouteKey, TaskProgress, TaskProgressUpdate,
};
use parking_lot::Mutex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub running: bool,
    pub progress: TaskProgress,
}

pub struct TaskTray {
    ctx: ViewContext,
    tasks: Mutex<Vec<Task>>,
    revision: Revision,
}

impl TaskTray {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            tasks: Mutex::new(Vec::new()),
            revision: Revision::default(),
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn remove(&self, id: &str) {
        self.tasks.lock().retain(|t| t.id != id);
        self.revision.bump();
    }

    fn progress_update(envelope: &Envelope) -> TaskProgressUpdate {
        match envelope.data_as::<TaskProgressUpdate>() {
            Ok(update) => update.unwrap_or_default(),
            Err(e) => {
                warn!("Unreadable task progress: {}", e);
                TaskProgressUpdate::default()
            }
        }
    }

    fn start(&self, envelope: &Envelope) {
        let mut progress = TaskProgress::default();
        progress.merge(Self::progress_update(envelope));
        let name = envelope.name.clone().unwrap_or_default();
        self.tasks.lock().push(Task {
            id: envelope.id.clone().unwrap_or_default(),
            name: name.clone(),
            running: true,
            progress,
        });
        self.ctx.notifier.info(&format!("{} added to Running Tasks", name));
    }

    fn update(&self, envelope: &Envelope, finished: bool) {
        let id = envelope.id.clone().unwrap_or_default();
        let update = Self::progress_update(envelope);
        let found = {
            let mut tasks = self.tasks.lock();
            match tasks.iter_mut().find(|t| t.id == id) {
                Some(task) => {
                    task.progress.merge(update);
                    if finished {
                        task.running = false;
                    } else if !task.progress.errors.is_empty() {
                        task.running = false;
                        task.progress.message = task.progress.errors.join(",");
                    }
                    true
                }
                None => false,
            }
        };
        if !found {
            self.ctx.notifier.info(&format!("Task with id {} not found", id));
        }
    }
}

impl View for TaskTray {}

impl Receiver for TaskTray {
    fn route(&self) -> RouteKey {
        RouteKey::new(Channel::Ui, component::TASK)
    }

    fn receive(&self, envelope: &Envelope) {
        if envelope.is_error() {
            self.ctx.show_error(envelope);
            return;
        }
        match envelope.sub() {
            sub::TASK_START => self.start(envelope),
            sub::TASK_UPDATE => self.update(envelope, false),
            sub::TASK_END => self.update(envelope, true),
            _ => {
                self.ctx.unhandled("Task", envelope);
                return;
            }
        }
        self.revision.bump();
    }
}
