//! Admin list screens as immutable snapshots.
//!
//! Each screen holds a `ListState` and replaces it with
//! `reduce(state, action)` whenever something happens. The reducer does no
//! I/O; the publisher's results are turned into actions with
//! [`actions_for`].

use flock_core::{PersistableRecord, Scalar};

use crate::publisher::SaveReport;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListState {
    pub items: Vec<PersistableRecord>,
    pub loading: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListAction {
    Loading,
    Loaded(Vec<PersistableRecord>),
    /// Insert or replace, matched on `id`.
    Saved(PersistableRecord),
    Removed { id: String },
    Failed(String),
    Notice(String),
}

pub fn reduce(state: ListState, action: ListAction) -> ListState {
    match action {
        ListAction::Loading => ListState {
            loading: true,
            error: None,
            ..state
        },
        ListAction::Loaded(items) => ListState {
            items,
            loading: false,
            error: None,
            ..state
        },
        ListAction::Saved(record) => {
            let mut items = state.items;
            let id = record_id(&record);
            match items
                .iter()
                .position(|item| id.is_some() && record_id(item) == id)
            {
                Some(at) => items[at] = record,
                None => items.push(record),
            }
            ListState {
                items,
                error: None,
                ..state
            }
        }
        ListAction::Removed { id } => ListState {
            items: state
                .items
                .into_iter()
                .filter(|item| record_id(item).as_deref() != Some(id.as_str()))
                .collect(),
            ..state
        },
        ListAction::Failed(message) => ListState {
            loading: false,
            error: Some(message),
            ..state
        },
        ListAction::Notice(message) => ListState {
            notice: Some(message),
            ..state
        },
    }
}

/// Actions that reflect a finished save on its list screen.
pub fn actions_for(report: &SaveReport) -> Vec<ListAction> {
    if !report.is_saved() {
        let message = report
            .persist
            .user_message()
            .unwrap_or_else(|| "Save failed".to_string());
        return vec![ListAction::Failed(message)];
    }

    let mut actions = Vec::new();
    if let Some(stored) = &report.persist.stored_record {
        actions.push(ListAction::Saved(stored.clone()));
    }
    actions.extend(report.messages().into_iter().map(ListAction::Notice));
    actions
}

fn record_id(record: &PersistableRecord) -> Option<String> {
    match record.get("id")? {
        Scalar::Text(id) => Some(id.clone()),
        Scalar::Integer(id) => Some(id.to_string()),
        _ => None,
    }
}
