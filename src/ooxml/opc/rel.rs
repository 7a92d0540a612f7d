//! Relationships between parts of an OPC package.
//!
//! Each source part (or the package itself) owns a [`Relationships`] collection
//! serialized to its `.rels` part. Relationship targets are kept relative to the
//! source part's directory.
use crate::common::error::{Error, Result};
use crate::common::xml::{XmlDocument, XmlElement};
use crate::ooxml::opc::constants::{namespace, target_mode};
use crate::ooxml::opc::packuri::PackURI;
use std::collections::HashMap;

/// A single relationship from a source part to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    r_id: String,
    reltype: String,
    target_ref: String,
    base_uri: String,
    is_external: bool,
}

impl Relationship {
    pub fn new(
        r_id: String,
        reltype: String,
        target_ref: String,
        base_uri: String,
        is_external: bool,
    ) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            base_uri,
            is_external,
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Target as written in the `.rels` part (relative partname or URL).
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Absolute partname of an internal target.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external {
            return Err(Error::InvalidFormat(format!(
                "relationship {} targets an external resource",
                self.r_id
            )));
        }
        PackURI::from_rel_ref(&self.base_uri, &self.target_ref)
    }
}

/// The relationships of one source part.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    base_uri: String,
    rels: HashMap<String, Relationship>,
}

impl Relationships {
    /// Empty collection for a source part living in `base_uri`.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            rels: HashMap::new(),
        }
    }

    /// Parse a `.rels` part.
    pub fn from_xml(base_uri: impl Into<String>, xml: &[u8]) -> Result<Self> {
        let mut rels = Self::new(base_uri);
        let doc = XmlDocument::parse(xml)?;
        for el in doc.root().children_named("Relationship") {
            let (Some(r_id), Some(reltype), Some(target)) =
                (el.attr("Id"), el.attr("Type"), el.attr("Target"))
            else {
                return Err(Error::InvalidFormat(
                    "relationship without Id, Type or Target".to_string(),
                ));
            };
            let is_external = el.attr("TargetMode") == Some(target_mode::EXTERNAL);
            rels.insert(r_id, reltype, target, is_external);
        }
        Ok(rels)
    }

    /// Add a relationship with a caller-chosen id, replacing any existing one.
    pub fn insert(&mut self, r_id: &str, reltype: &str, target_ref: &str, is_external: bool) {
        let rel = Relationship::new(
            r_id.to_string(),
            reltype.to_string(),
            target_ref.to_string(),
            self.base_uri.clone(),
            is_external,
        );
        self.rels.insert(r_id.to_string(), rel);
    }

    /// Add an internal relationship under a fresh id and return the id.
    pub fn add(&mut self, reltype: &str, target_ref: &str) -> String {
        let r_id = self.next_r_id();
        self.insert(&r_id, reltype, target_ref, false);
        r_id
    }

    /// Id of an existing internal relationship of `reltype` to `target_ref`,
    /// adding one when absent.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str) -> String {
        let existing = self.rels.values().find(|rel| {
            rel.reltype() == reltype && rel.target_ref() == target_ref && !rel.is_external()
        });
        match existing {
            Some(rel) => rel.r_id().to_string(),
            None => self.add(reltype, target_ref),
        }
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    /// The single relationship of `reltype`.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.values().filter(|rel| rel.reltype() == reltype);
        match (matching.next(), matching.next()) {
            (Some(rel), None) => Ok(rel),
            (None, _) => Err(Error::RelationshipNotFound(format!(
                "no relationship of type '{}'",
                reltype
            ))),
            (Some(_), Some(_)) => Err(Error::InvalidFormat(format!(
                "multiple relationships of type '{}'",
                reltype
            ))),
        }
    }

    /// Relationships of `reltype` in id order.
    pub fn with_reltype(&self, reltype: &str) -> Vec<&Relationship> {
        let mut found: Vec<&Relationship> =
            self.rels.values().filter(|rel| rel.reltype() == reltype).collect();
        found.sort_by(|a, b| r_id_order(a.r_id(), b.r_id()));
        found
    }

    /// Iterate in unspecified order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        self.rels.remove(r_id)
    }

    /// Drop every internal relationship whose target is `partname`.
    ///
    /// Returns the ids removed.
    pub fn remove_targeting(&mut self, partname: &PackURI) -> Vec<String> {
        let doomed: Vec<String> = self
            .rels
            .values()
            .filter(|rel| rel.target_partname().is_ok_and(|target| &target == partname))
            .map(|rel| rel.r_id().to_string())
            .collect();
        for r_id in &doomed {
            self.rels.remove(r_id);
        }
        doomed
    }

    /// Next free id, filling gaps (`rId1`, `rId2`, ...).
    pub fn next_r_id(&self) -> String {
        let mut used: Vec<u32> = self
            .rels
            .keys()
            .filter_map(|r_id| r_id.strip_prefix("rId"))
            .filter_map(|digits| atoi_simd::parse::<u32, false, false>(digits.as_bytes()).ok())
            .collect();
        used.sort_unstable();

        let mut next = 1u32;
        for num in used {
            match num.cmp(&next) {
                std::cmp::Ordering::Equal => next += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }
        format!("rId{}", next)
    }

    /// Serialize to a `.rels` part, ordered by id.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.rels.len() * 160);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Relationships xmlns="{}">"#, namespace::OPC_RELATIONSHIPS));

        let mut rels: Vec<&Relationship> = self.rels.values().collect();
        rels.sort_by(|a, b| r_id_order(a.r_id(), b.r_id()));
        for rel in rels {
            let mut el = XmlElement::new("Relationship")
                .with_attr("Id", rel.r_id())
                .with_attr("Type", rel.reltype())
                .with_attr("Target", rel.target_ref());
            if rel.is_external() {
                el.set_attr("TargetMode", target_mode::EXTERNAL);
            }
            el.write_to(&mut xml);
        }

        xml.push_str("</Relationships>");
        xml
    }
}

/// Order ids numerically when both follow the `rIdN` pattern.
fn r_id_order(a: &str, b: &str) -> std::cmp::Ordering {
    let num = |r_id: &str| {
        r_id.strip_prefix("rId")
            .and_then(|digits| atoi_simd::parse::<u32, false, false>(digits.as_bytes()).ok())
    };
    match (num(a), num(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}
