use std::fmt;

use serde::{Deserialize, Serialize};

use flock_blob::UploadLimits;
use flock_core::{FieldKind, Order, RecordSchema};

/// Largest team member photo accepted by the dashboard.
pub const TEAM_PHOTO_MAX_BYTES: u64 = 300 * 1024;

/// The kinds of content an admin can manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Event,
    Newsletter,
    GalleryPhoto,
    Roster,
    TeamMember,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Event,
        ContentKind::Newsletter,
        ContentKind::GalleryPhoto,
        ContentKind::Roster,
        ContentKind::TeamMember,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Event => "events",
            ContentKind::Newsletter => "newsletters",
            ContentKind::GalleryPhoto => "gallery_photos",
            ContentKind::Roster => "rosters",
            ContentKind::TeamMember => "team_members",
        }
    }

    /// Blob namespace that holds this kind's files.
    pub fn namespace(&self) -> &'static str {
        match self {
            ContentKind::Event => "event-images",
            ContentKind::Newsletter => "newsletters",
            ContentKind::GalleryPhoto => "gallery",
            ContentKind::Roster => "rosters",
            ContentKind::TeamMember => "team-photos",
        }
    }

    pub fn media_field(&self) -> &'static str {
        match self {
            ContentKind::Event | ContentKind::GalleryPhoto => "image_url",
            ContentKind::Newsletter | ContentKind::Roster => "pdf_url",
            ContentKind::TeamMember => "photo_url",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Event => "event",
            ContentKind::Newsletter => "newsletter",
            ContentKind::GalleryPhoto => "photo",
            ContentKind::Roster => "roster",
            ContentKind::TeamMember => "team member",
        }
    }

    pub fn schema(&self) -> RecordSchema {
        let schema = RecordSchema::new(self.table()).media(self.media_field());
        match self {
            ContentKind::Event => schema
                .required("title", FieldKind::Text)
                .required("event_date", FieldKind::Date)
                .optional("event_time", FieldKind::Text)
                .optional("location", FieldKind::Text)
                .optional("description", FieldKind::Text),
            ContentKind::Newsletter => schema
                .required("title", FieldKind::Text)
                .required("published_on", FieldKind::Date)
                .optional("summary", FieldKind::Text),
            ContentKind::GalleryPhoto => schema
                .optional("caption", FieldKind::Text)
                .optional("album", FieldKind::Text),
            ContentKind::Roster => schema
                .required("title", FieldKind::Text)
                .required("period", FieldKind::Text)
                .optional("notes", FieldKind::Text),
            ContentKind::TeamMember => schema
                .required("name", FieldKind::Text)
                .required("email", FieldKind::Text)
                .optional("role", FieldKind::Text)
                .optional("bio", FieldKind::Text)
                .optional("display_order", FieldKind::Integer),
        }
    }

    /// Listing order on the admin screens.
    pub fn list_order(&self) -> Order {
        match self {
            ContentKind::Event => Order::asc("event_date"),
            ContentKind::TeamMember => Order::asc("display_order"),
            _ => Order::desc("created_at"),
        }
    }

    /// Upload ceilings the dashboard enforces for every kind.
    pub fn default_limits() -> UploadLimits {
        UploadLimits::new().with_ceiling(ContentKind::TeamMember.namespace(), TEAM_PHOTO_MAX_BYTES)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
