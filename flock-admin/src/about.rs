use serde::Serialize;

use flock_core::{FlockResult, PersistableRecord, Row};

use crate::content::ContentKind;
use crate::publisher::ContentPublisher;

/// One team member as shown on the public About page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamProfile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// URL or data URI, ready for an `img` tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(skip)]
    display_order: Option<i64>,
}

/// Public projection of the team members table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AboutPage {
    pub team: Vec<TeamProfile>,
}

impl AboutPage {
    pub fn from_rows(rows: &[Row]) -> Self {
        let media_field = ContentKind::TeamMember.media_field();
        let records: Vec<_> = rows
            .iter()
            .map(|row| PersistableRecord::from_row(row, Some(media_field)))
            .collect();
        Self::from_records(&records)
    }

    /// Members without a name are skipped; the rest are ordered by
    /// `display_order`, unnumbered members last.
    pub fn from_records(records: &[PersistableRecord]) -> Self {
        let mut team: Vec<TeamProfile> = records
            .iter()
            .filter_map(|record| {
                let name = non_blank(record.text("name"))?;
                Some(TeamProfile {
                    name,
                    role: non_blank(record.text("role")),
                    bio: non_blank(record.text("bio")),
                    photo: record.media().map(|media| media.to_uri()),
                    display_order: record.get("display_order").and_then(|v| v.as_i64()),
                })
            })
            .collect();

        team.sort_by_key(|member| (member.display_order.is_none(), member.display_order));
        Self { team }
    }

    pub async fn load(publisher: &ContentPublisher) -> FlockResult<Self> {
        let records = publisher.list(ContentKind::TeamMember).await?;
        Ok(Self::from_records(&records))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
