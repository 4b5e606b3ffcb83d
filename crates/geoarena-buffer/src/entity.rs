//! Typed entity builders on top of the raw [`BuilderStack`] protocol.
//!
//! Each `open_*` writes the entity header, fixed fields and user name in
//! one step. Collection entries (`add_tag`, `add_node_ref`, `add_member`)
//! open the matching child list on first use and close a different open
//! list, so an entity's children appear in the order their first entry
//! was added.

use geoarena_types::collections::{NodeRef, encode_member, encode_tag};
use geoarena_types::location::LOCATION_SIZE;
use geoarena_types::object::{CHANGESET_FIELDS_SIZE, OBJECT_FIELDS_SIZE};
use geoarena_types::{ChangesetFields, ItemType, Location, ObjectFields};
use geoarena_wire::varint::push_length_prefixed;

use crate::buffer::Buffer;
use crate::builder::BuilderStack;
use crate::error::BuilderError;

impl BuilderStack {
    /// Open a node, way or relation. `location` is only stored for nodes.
    ///
    /// # Errors
    ///
    /// [`BuilderError::NotAnEntity`] for other kinds, plus everything
    /// [`open`](Self::open) reports. On failure nothing stays open.
    pub fn open_object(
        &mut self,
        buffer: &mut Buffer,
        kind: ItemType,
        fields: &ObjectFields,
        location: Location,
        user: &str,
    ) -> Result<(), BuilderError> {
        if !kind.is_object() {
            return Err(BuilderError::NotAnEntity { kind });
        }
        let mut body = Vec::with_capacity(OBJECT_FIELDS_SIZE + LOCATION_SIZE + user.len() + 2);
        fields.write_to(&mut body);
        if kind == ItemType::Node {
            location.write_to(&mut body);
        }
        push_length_prefixed(&mut body, user.as_bytes());
        self.open_with_body(buffer, kind, &body)
    }

    /// # Errors
    ///
    /// Same as [`open_object`](Self::open_object).
    pub fn open_node(
        &mut self,
        buffer: &mut Buffer,
        fields: &ObjectFields,
        location: Location,
        user: &str,
    ) -> Result<(), BuilderError> {
        self.open_object(buffer, ItemType::Node, fields, location, user)
    }

    /// # Errors
    ///
    /// Same as [`open_object`](Self::open_object).
    pub fn open_way(
        &mut self,
        buffer: &mut Buffer,
        fields: &ObjectFields,
        user: &str,
    ) -> Result<(), BuilderError> {
        self.open_object(buffer, ItemType::Way, fields, Location::undefined(), user)
    }

    /// # Errors
    ///
    /// Same as [`open_object`](Self::open_object).
    pub fn open_relation(
        &mut self,
        buffer: &mut Buffer,
        fields: &ObjectFields,
        user: &str,
    ) -> Result<(), BuilderError> {
        self.open_object(
            buffer,
            ItemType::Relation,
            fields,
            Location::undefined(),
            user,
        )
    }

    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn open_changeset(
        &mut self,
        buffer: &mut Buffer,
        fields: &ChangesetFields,
        user: &str,
    ) -> Result<(), BuilderError> {
        let mut body = Vec::with_capacity(CHANGESET_FIELDS_SIZE + user.len() + 2);
        fields.write_to(&mut body);
        push_length_prefixed(&mut body, user.as_bytes());
        self.open_with_body(buffer, ItemType::Changeset, &body)
    }

    /// Append a tag to the open entity's tag list.
    ///
    /// # Errors
    ///
    /// See [`ensure_child`](Self::ensure_child) and
    /// [`append_field`](Self::append_field).
    pub fn add_tag(&mut self, buffer: &mut Buffer, key: &str, value: &str) -> Result<(), BuilderError> {
        let mut entry = Vec::with_capacity(key.len() + value.len() + 4);
        encode_tag(&mut entry, key, value);
        self.add_entry(buffer, ItemType::TagList, &entry)
    }

    /// Append a node reference to the open way's node list.
    ///
    /// # Errors
    ///
    /// [`BuilderError::InvalidChild`] unless a way is open.
    pub fn add_node_ref(&mut self, buffer: &mut Buffer, node_ref: NodeRef) -> Result<(), BuilderError> {
        self.add_node_ref_to(buffer, ItemType::WayNodeList, node_ref)
    }

    /// Append a node reference to a node reference list of kind `list`
    /// (way node list, outer ring or inner ring).
    ///
    /// # Errors
    ///
    /// [`BuilderError::InvalidChild`] if `list` is not a node reference
    /// list the open entity can hold.
    pub fn add_node_ref_to(
        &mut self,
        buffer: &mut Buffer,
        list: ItemType,
        node_ref: NodeRef,
    ) -> Result<(), BuilderError> {
        let mut entry = Vec::with_capacity(geoarena_types::collections::NODE_REF_SIZE);
        node_ref.write_to(&mut entry);
        self.add_entry(buffer, list, &entry)
    }

    /// Append a member to the open relation's member list.
    ///
    /// # Errors
    ///
    /// [`BuilderError::InvalidChild`] unless a relation is open, or
    /// [`BuilderError::NotAnEntity`] if `kind` is not a node, way or
    /// relation.
    pub fn add_member(
        &mut self,
        buffer: &mut Buffer,
        kind: ItemType,
        id: i64,
        role: &str,
    ) -> Result<(), BuilderError> {
        if !kind.is_object() {
            return Err(BuilderError::NotAnEntity { kind });
        }
        let mut entry = Vec::with_capacity(role.len() + 12);
        encode_member(&mut entry, kind, id, role);
        self.add_entry(buffer, ItemType::RelationMemberList, &entry)
    }

    /// Close any open child list and the entity itself, committing it.
    /// Returns the committed offset.
    ///
    /// # Errors
    ///
    /// Same as [`close`](Self::close).
    pub fn finish(&mut self, buffer: &mut Buffer) -> Result<Option<usize>, BuilderError> {
        self.close_children(buffer)?;
        self.close(buffer)
    }

    fn open_with_body(
        &mut self,
        buffer: &mut Buffer,
        kind: ItemType,
        body: &[u8],
    ) -> Result<(), BuilderError> {
        self.open(buffer, kind)?;
        if let Err(err) = self.append_field(buffer, body) {
            self.abort(buffer);
            return Err(err);
        }
        Ok(())
    }

    fn add_entry(&mut self, buffer: &mut Buffer, list: ItemType, entry: &[u8]) -> Result<(), BuilderError> {
        self.ensure_child(buffer, list)?;
        self.append_field(buffer, entry)
    }
}
