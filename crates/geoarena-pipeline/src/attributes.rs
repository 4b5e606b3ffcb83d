use std::str::FromStr;

use geoarena_types::{Bounds, ChangesetFields, ItemType, Location, ObjectFields, Timestamp};

use crate::error::PipelineError;

/// Fixed fields of one entity, parsed from its textual attributes.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntityAttributes {
    pub object: ObjectFields,
    pub changeset: ChangesetFields,
    pub location: Location,
    pub user: String,
}

impl EntityAttributes {
    /// Parse the attributes of a `kind` entity. `id` is required, unknown
    /// keys are ignored. Without `read_metadata`, version, changeset,
    /// timestamp, uid and user are left at their defaults.
    pub fn parse(
        kind: ItemType,
        attributes: &[(String, String)],
        read_metadata: bool,
        position: u64,
    ) -> Result<Self, PipelineError> {
        let mut out = Self::default();
        let mut id = None;
        let (mut lat, mut lon) = (None, None);
        let (mut min_lat, mut min_lon, mut max_lat, mut max_lon) = (None, None, None, None);

        for (key, value) in attributes {
            let value = value.as_str();
            match key.as_str() {
                "id" => id = Some(number::<i64>(key, value, position)?),
                "visible" => out.object.visible = boolean(key, value, position)?,
                "lat" => lat = Some(number::<f64>(key, value, position)?),
                "lon" => lon = Some(number::<f64>(key, value, position)?),
                "created_at" => out.changeset.created_at = timestamp(key, value, position)?,
                "closed_at" => out.changeset.closed_at = timestamp(key, value, position)?,
                "num_changes" => out.changeset.num_changes = number(key, value, position)?,
                "min_lat" => min_lat = Some(number::<f64>(key, value, position)?),
                "min_lon" => min_lon = Some(number::<f64>(key, value, position)?),
                "max_lat" => max_lat = Some(number::<f64>(key, value, position)?),
                "max_lon" => max_lon = Some(number::<f64>(key, value, position)?),
                _ if !read_metadata => {}
                "version" => out.object.version = number(key, value, position)?,
                "changeset" => out.object.changeset = number(key, value, position)?,
                "timestamp" => out.object.timestamp = timestamp(key, value, position)?,
                "uid" => {
                    let uid = number(key, value, position)?;
                    out.object.uid = uid;
                    out.changeset.uid = uid;
                }
                "user" => out.user = value.to_string(),
                _ => {}
            }
        }

        let id = id.ok_or_else(|| PipelineError::format(format!("{kind} without an id"), position))?;
        out.object.id = id;
        out.changeset.id = id;

        if let (Some(lon), Some(lat)) = (lon, lat) {
            out.location = Location::from_degrees(lon, lat);
        }
        if let (Some(min_lon), Some(min_lat), Some(max_lon), Some(max_lat)) =
            (min_lon, min_lat, max_lon, max_lat)
        {
            out.changeset.bounds = Bounds::new(
                Location::from_degrees(min_lon, min_lat),
                Location::from_degrees(max_lon, max_lat),
            );
        }
        Ok(out)
    }
}

fn number<T: FromStr>(key: &str, value: &str, position: u64) -> Result<T, PipelineError> {
    value
        .trim()
        .parse()
        .map_err(|_| PipelineError::format(format!("invalid {key} '{value}'"), position))
}

fn boolean(key: &str, value: &str, position: u64) -> Result<bool, PipelineError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(PipelineError::format(
            format!("invalid {key} '{value}'"),
            position,
        )),
    }
}

fn timestamp(key: &str, value: &str, position: u64) -> Result<Timestamp, PipelineError> {
    Timestamp::parse(value)
        .map_err(|e| PipelineError::format(format!("invalid {key} '{value}': {e}"), position))
}
