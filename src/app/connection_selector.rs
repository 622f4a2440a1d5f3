use anyhow::Result;

use crate::app::{App, AppMode, ConnectionField};
use crate::compare::Side;
use crate::config::ConnectionProfile;

// Connection selector navigation and actions
impl App {
    pub fn selector_up(&mut self) {
        if self.selected_profile > 0 {
            self.selected_profile -= 1;
        }
    }

    pub fn selector_down(&mut self) {
        if self.selected_profile < self.config.connections.len().saturating_sub(1) {
            self.selected_profile += 1;
        }
    }

    /// Opens the selected profile for `side`, ready for the access key.
    pub fn assign_selected_profile(&mut self, side: Side) {
        if let Some(profile) = self.config.connections.get(self.selected_profile) {
            self.name = profile.name.clone();
            self.url = profile.url.clone();
            self.key = String::new();
            self.editing_side = side;
            self.mode = AppMode::ConnectionEdit;
            self.connection_field = ConnectionField::Key;
        }
    }

    pub fn create_new_connection(&mut self, side: Side) {
        let profile = ConnectionProfile::new(String::new());
        self.name = profile.name;
        self.url = profile.url;
        self.key = String::new();
        self.editing_side = side;
        self.mode = AppMode::ConnectionEdit;
        self.connection_field = ConnectionField::Name;
    }

    pub fn delete_selected_profile(&mut self) -> Result<()> {
        if self.selected_profile < self.config.connections.len() {
            self.config.connections.remove(self.selected_profile);
            if self.selected_profile > 0 {
                self.selected_profile -= 1;
            }
            self.config.save()?;
        }
        Ok(())
    }
}
