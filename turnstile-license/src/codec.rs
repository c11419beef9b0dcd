//! Structured markup and compact binary encodings of restrictions and licenses.
//!
//! # Markup
//!
//! One element per restriction, named by its kind, carrying kind-specific
//! attributes and no children: `<Memory totalMemory="4096"/>`. Zero or empty
//! values are omitted on encode and default to zero on decode. Both the
//! self-closing form and an open/close pair are accepted.
//!
//! A license document nests restrictions next to features and fields:
//!
//! ```text
//! <License id="…">
//!   <Features><Feature name="Reporting" description="…">data</Feature></Features>
//!   <Fields><Field name="seats" type="number">5</Field></Fields>
//!   <Restrictions><Memory totalMemory="4096"/></Restrictions>
//! </License>
//! ```
//!
//! # Binary
//!
//! Fixed-width little-endian fields in declaration order with no type tags,
//! so the reader must know the kind up front. Strings are a `u32` byte length
//! followed by UTF-8. Integers are read back with exactly the width they were
//! written with.

use crate::error::{LicenseError, LicenseResult};
use crate::license::{Feature, Field, FieldValue, License, LicenseId};
use crate::registry::LicenseFactory;
use crate::restriction::{
    BetaRestriction, BuildType, DomainRestriction, HardwareRestriction, MemoryRestriction,
    Restriction, TrialRestriction, UsageRestriction,
};
use bytes::{Buf, BufMut, BytesMut};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::str::FromStr;
use std::sync::Arc;

/// External encoding of a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Markup,
    Binary,
}

/// Attributes of one markup element, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupAttributes(Vec<(String, String)>);

impl MarkupAttributes {
    pub fn set(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parses `name`, or returns the type's zero value when absent.
    pub fn parse_or_default<T: FromStr + Default>(&self, name: &str) -> LicenseResult<T> {
        match self.get(name) {
            None => Ok(T::default()),
            Some(raw) => raw.trim().parse().map_err(|_| {
                LicenseError::malformed(format!("attribute {name}={raw:?} is not valid"))
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Per-kind state conversion for both formats.
pub(crate) trait WireState {
    fn write_markup(&self, attrs: &mut MarkupAttributes);
    fn read_markup(&mut self, attrs: &MarkupAttributes) -> LicenseResult<()>;
    fn write_binary(&self, buf: &mut BytesMut);
    fn read_binary(&mut self, buf: &mut &[u8]) -> LicenseResult<()>;
}

// ── Binary primitives ────────────────────────────────────────────

fn need(buf: &[u8], n: usize, what: &str) -> LicenseResult<()> {
    if buf.len() < n {
        return Err(LicenseError::malformed(format!(
            "truncated binary input reading {what}: need {n} bytes, have {}",
            buf.len()
        )));
    }
    Ok(())
}

fn read_u8(buf: &mut &[u8], what: &str) -> LicenseResult<u8> {
    need(*buf, 1, what)?;
    Ok(buf.get_u8())
}

fn read_u32(buf: &mut &[u8], what: &str) -> LicenseResult<u32> {
    need(*buf, 4, what)?;
    Ok(buf.get_u32_le())
}

fn read_u64(buf: &mut &[u8], what: &str) -> LicenseResult<u64> {
    need(*buf, 8, what)?;
    Ok(buf.get_u64_le())
}

fn read_string(buf: &mut &[u8], what: &str) -> LicenseResult<String> {
    let len = read_u32(buf, what)? as usize;
    need(*buf, len, what)?;
    let data: &[u8] = *buf;
    let (head, tail) = data.split_at(len);
    let s = std::str::from_utf8(head)
        .map_err(|e| LicenseError::malformed(format!("{what} is not UTF-8: {e}")))?
        .to_string();
    *buf = tail;
    Ok(s)
}

fn write_string(buf: &mut BytesMut, s: &str) {
    buf.put_u32_le(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

// ── Per-kind wire state ──────────────────────────────────────────

impl WireState for MemoryRestriction {
    fn write_markup(&self, attrs: &mut MarkupAttributes) {
        if self.total_memory != 0 {
            attrs.set("totalMemory", self.total_memory);
        }
    }

    fn read_markup(&mut self, attrs: &MarkupAttributes) -> LicenseResult<()> {
        self.total_memory = attrs.parse_or_default("totalMemory")?;
        Ok(())
    }

    fn write_binary(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.total_memory);
    }

    fn read_binary(&mut self, buf: &mut &[u8]) -> LicenseResult<()> {
        self.total_memory = read_u64(buf, "totalMemory")?;
        Ok(())
    }
}

impl WireState for TrialRestriction {
    fn write_markup(&self, attrs: &mut MarkupAttributes) {
        if self.expire_days != 0 {
            attrs.set("expireDays", self.expire_days);
        }
        if self.run_count != 0 {
            attrs.set("runCount", self.run_count);
        }
        if self.run_instances != 0 {
            attrs.set("runInstances", self.run_instances);
        }
    }

    fn read_markup(&mut self, attrs: &MarkupAttributes) -> LicenseResult<()> {
        self.expire_days = attrs.parse_or_default("expireDays")?;
        self.run_count = attrs.parse_or_default("runCount")?;
        self.run_instances = attrs.parse_or_default("runInstances")?;
        Ok(())
    }

    fn write_binary(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.expire_days);
        buf.put_u32_le(self.run_count);
        buf.put_u32_le(self.run_instances);
    }

    fn read_binary(&mut self, buf: &mut &[u8]) -> LicenseResult<()> {
        self.expire_days = read_u32(buf, "expireDays")?;
        self.run_count = read_u32(buf, "runCount")?;
        self.run_instances = read_u32(buf, "runInstances")?;
        Ok(())
    }
}

impl WireState for HardwareRestriction {
    fn write_markup(&self, attrs: &mut MarkupAttributes) {
        if !self.hardware_key.is_empty() {
            attrs.set("hardwareKey", &self.hardware_key);
        }
    }

    fn read_markup(&mut self, attrs: &MarkupAttributes) -> LicenseResult<()> {
        self.hardware_key = attrs.get("hardwareKey").unwrap_or_default().to_string();
        Ok(())
    }

    fn write_binary(&self, buf: &mut BytesMut) {
        write_string(buf, &self.hardware_key);
    }

    fn read_binary(&mut self, buf: &mut &[u8]) -> LicenseResult<()> {
        self.hardware_key = read_string(buf, "hardwareKey")?;
        Ok(())
    }
}

impl WireState for BetaRestriction {
    fn write_markup(&self, attrs: &mut MarkupAttributes) {
        if self.build_type != BuildType::Any {
            attrs.set("buildType", self.build_type);
        }
    }

    fn read_markup(&mut self, attrs: &MarkupAttributes) -> LicenseResult<()> {
        self.build_type = attrs.parse_or_default("buildType")?;
        Ok(())
    }

    fn write_binary(&self, buf: &mut BytesMut) {
        buf.put_u8(self.build_type as u8);
    }

    fn read_binary(&mut self, buf: &mut &[u8]) -> LicenseResult<()> {
        self.build_type = BuildType::from_u8(read_u8(buf, "buildType")?)?;
        Ok(())
    }
}

impl WireState for DomainRestriction {
    fn write_markup(&self, attrs: &mut MarkupAttributes) {
        if !self.domain.is_empty() {
            attrs.set("domain", &self.domain);
        }
    }

    fn read_markup(&mut self, attrs: &MarkupAttributes) -> LicenseResult<()> {
        self.domain = attrs.get("domain").unwrap_or_default().to_string();
        Ok(())
    }

    fn write_binary(&self, buf: &mut BytesMut) {
        write_string(buf, &self.domain);
    }

    fn read_binary(&mut self, buf: &mut &[u8]) -> LicenseResult<()> {
        self.domain = read_string(buf, "domain")?;
        Ok(())
    }
}

impl WireState for UsageRestriction {
    fn write_markup(&self, attrs: &mut MarkupAttributes) {
        if self.usage != 0 {
            attrs.set("usage", self.usage);
        }
    }

    fn read_markup(&mut self, attrs: &MarkupAttributes) -> LicenseResult<()> {
        self.usage = attrs.parse_or_default("usage")?;
        Ok(())
    }

    fn write_binary(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.usage);
    }

    fn read_binary(&mut self, buf: &mut &[u8]) -> LicenseResult<()> {
        self.usage = read_u64(buf, "usage")?;
        Ok(())
    }
}

// ── Markup reading ───────────────────────────────────────────────

/// An element start tag with its attributes.
#[derive(Debug)]
struct Element {
    name: String,
    attrs: MarkupAttributes,
    /// True for `<x/>`, false for `<x>` (a close tag follows).
    empty: bool,
}

#[derive(Debug)]
enum Node {
    Open(Element),
    Close(String),
    Text(String),
    Eof,
}

struct MarkupReader<'a> {
    reader: Reader<&'a [u8]>,
}

fn utf8(bytes: &[u8]) -> LicenseResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| LicenseError::malformed(format!("markup is not UTF-8: {e}")))
}

fn element(start: &BytesStart<'_>, empty: bool) -> LicenseResult<Element> {
    let mut attrs = MarkupAttributes::default();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| LicenseError::malformed(format!("attribute: {e}")))?;
        let key = utf8(attr.key.as_ref())?;
        let value = attr.unescape_value()?;
        attrs.set(&key, value);
    }
    Ok(Element {
        name: utf8(start.name().as_ref())?,
        attrs,
        empty,
    })
}

impl<'a> MarkupReader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            reader: Reader::from_str(input),
        }
    }

    /// Next structural node. Whitespace between elements is skipped.
    fn next(&mut self) -> LicenseResult<Node> {
        loop {
            match self.next_raw()? {
                Node::Text(t) if t.trim().is_empty() => continue,
                node => return Ok(node),
            }
        }
    }

    /// Next node with text kept verbatim; declarations and comments are skipped.
    fn next_raw(&mut self) -> LicenseResult<Node> {
        loop {
            let node = match self.reader.read_event()? {
                Event::Start(e) => Node::Open(element(&e, false)?),
                Event::Empty(e) => Node::Open(element(&e, true)?),
                Event::End(e) => Node::Close(utf8(e.name().as_ref())?),
                Event::Text(t) => Node::Text(t.unescape()?.into_owned()),
                Event::CData(c) => Node::Text(utf8(&c)?),
                Event::Eof => Node::Eof,
                _ => continue,
            };
            return Ok(node);
        }
    }

    fn expect_open(&mut self) -> LicenseResult<Element> {
        match self.next()? {
            Node::Open(el) => Ok(el),
            other => Err(LicenseError::malformed(format!("expected an element, found {other:?}"))),
        }
    }

    fn expect_eof(&mut self) -> LicenseResult<()> {
        match self.next()? {
            Node::Eof => Ok(()),
            other => Err(LicenseError::malformed(format!("trailing content: {other:?}"))),
        }
    }

    /// Collects text up to the close tag of `el`. Empty elements yield "".
    fn text_of(&mut self, el: &Element) -> LicenseResult<String> {
        if el.empty {
            return Ok(String::new());
        }
        let mut text = String::new();
        loop {
            match self.next_raw()? {
                Node::Text(t) => text.push_str(&t),
                Node::Close(name) if name == el.name => return Ok(text),
                other => {
                    return Err(LicenseError::malformed(format!(
                        "unexpected {other:?} inside <{}>",
                        el.name
                    )));
                }
            }
        }
    }

    /// Consumes the close tag of a childless element, if it has one.
    fn finish_childless(&mut self, el: &Element) -> LicenseResult<()> {
        let text = self.text_of(el)?;
        if !text.trim().is_empty() {
            return Err(LicenseError::malformed(format!("<{}> takes no content", el.name)));
        }
        Ok(())
    }
}

// ── Markup writing ───────────────────────────────────────────────

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> LicenseResult<()> {
    writer
        .write_event(event)
        .map_err(|e| LicenseError::malformed(format!("writing markup: {e}")))
}

fn start_tag<'a>(name: &'a str, attrs: &'a MarkupAttributes) -> BytesStart<'a> {
    BytesStart::new(name).with_attributes(attrs.iter())
}

fn write_restriction(writer: &mut Writer<Vec<u8>>, r: &Restriction) -> LicenseResult<()> {
    let mut attrs = MarkupAttributes::default();
    r.wire_state().write_markup(&mut attrs);
    emit(writer, Event::Empty(start_tag(r.kind(), &attrs)))
}

fn into_string(writer: Writer<Vec<u8>>) -> LicenseResult<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| LicenseError::malformed(format!("markup is not UTF-8: {e}")))
}

/// Encodes a restriction as a single markup element.
pub fn to_markup(r: &Restriction) -> LicenseResult<String> {
    let mut writer = Writer::new(Vec::new());
    write_restriction(&mut writer, r)?;
    into_string(writer)
}

/// Encodes a restriction's fields in binary declaration order.
#[must_use]
pub fn to_binary(r: &Restriction) -> Vec<u8> {
    let mut buf = BytesMut::new();
    r.wire_state().write_binary(&mut buf);
    buf.to_vec()
}

/// Converts restrictions and licenses between their in-memory form and the
/// external encodings. Decoding creates restrictions through a
/// [`LicenseFactory`], so only kinds the factory supports can be read.
#[derive(Clone)]
pub struct RestrictionCodec {
    factory: Arc<dyn LicenseFactory>,
}

impl RestrictionCodec {
    #[must_use]
    pub fn new(factory: Arc<dyn LicenseFactory>) -> Self {
        Self { factory }
    }

    /// Encodes a restriction. Markup output is UTF-8.
    pub fn encode(&self, r: &Restriction, format: Format) -> LicenseResult<Vec<u8>> {
        match format {
            Format::Markup => to_markup(r).map(String::into_bytes),
            Format::Binary => Ok(to_binary(r)),
        }
    }

    /// Decodes a restriction of `kind`.
    ///
    /// For markup the element name must equal `kind`.
    pub fn decode(&self, format: Format, kind: &str, input: &[u8]) -> LicenseResult<Restriction> {
        match format {
            Format::Markup => {
                let text = std::str::from_utf8(input)
                    .map_err(|e| LicenseError::malformed(format!("markup is not UTF-8: {e}")))?;
                let r = self.decode_markup(text)?;
                if r.kind() != kind {
                    return Err(LicenseError::malformed(format!(
                        "expected <{kind}>, found <{}>",
                        r.kind()
                    )));
                }
                Ok(r)
            }
            Format::Binary => self.decode_binary(kind, input),
        }
    }

    /// Decodes a single markup element; the kind is taken from its name.
    pub fn decode_markup(&self, input: &str) -> LicenseResult<Restriction> {
        let mut reader = MarkupReader::new(input);
        let el = reader.expect_open()?;
        let r = self.restriction_from(&el)?;
        reader.finish_childless(&el)?;
        reader.expect_eof()?;
        Ok(r)
    }

    /// Decodes binary state for a restriction of `kind`. The whole input
    /// must be consumed.
    pub fn decode_binary(&self, kind: &str, input: &[u8]) -> LicenseResult<Restriction> {
        let mut r = self.factory.require_restriction(kind)?;
        let mut buf = input;
        r.wire_state_mut().read_binary(&mut buf)?;
        if buf.has_remaining() {
            return Err(LicenseError::malformed(format!(
                "{} trailing bytes after {kind}",
                buf.remaining()
            )));
        }
        Ok(r)
    }

    fn restriction_from(&self, el: &Element) -> LicenseResult<Restriction> {
        let mut r = self.factory.require_restriction(&el.name)?;
        r.wire_state_mut().read_markup(&el.attrs)?;
        Ok(r)
    }

    /// Encodes a whole license document.
    pub fn encode_license(&self, license: &License) -> LicenseResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let id = license.id().to_string();

        let root = BytesStart::new("License").with_attributes([("id", id.as_str())]);
        emit(&mut writer, Event::Start(root))?;

        emit(&mut writer, Event::Start(BytesStart::new("Features")))?;
        for feature in license.features() {
            let mut attrs = MarkupAttributes::default();
            attrs.set("name", &feature.name);
            if let Some(description) = &feature.description {
                attrs.set("description", description);
            }
            match &feature.data {
                Some(data) => {
                    emit(&mut writer, Event::Start(start_tag("Feature", &attrs)))?;
                    emit(&mut writer, Event::Text(BytesText::new(data)))?;
                    emit(&mut writer, Event::End(BytesEnd::new("Feature")))?;
                }
                None => emit(&mut writer, Event::Empty(start_tag("Feature", &attrs)))?,
            }
        }
        emit(&mut writer, Event::End(BytesEnd::new("Features")))?;

        emit(&mut writer, Event::Start(BytesStart::new("Fields")))?;
        for field in license.fields() {
            let (ty, value) = match &field.value {
                FieldValue::Text(s) => ("text", s.clone()),
                FieldValue::Number(n) => ("number", n.to_string()),
            };
            let mut attrs = MarkupAttributes::default();
            attrs.set("name", &field.name);
            attrs.set("type", ty);
            emit(&mut writer, Event::Start(start_tag("Field", &attrs)))?;
            emit(&mut writer, Event::Text(BytesText::new(&value)))?;
            emit(&mut writer, Event::End(BytesEnd::new("Field")))?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("Fields")))?;

        emit(&mut writer, Event::Start(BytesStart::new("Restrictions")))?;
        for r in license.restrictions() {
            write_restriction(&mut writer, r)?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("Restrictions")))?;

        emit(&mut writer, Event::End(BytesEnd::new("License")))?;
        into_string(writer)
    }

    /// Decodes a whole license document.
    ///
    /// A restriction kind the factory does not support fails the decode with
    /// `UnsupportedRestrictionKind`; it is never silently dropped.
    pub fn decode_license(&self, input: &str) -> LicenseResult<License> {
        let mut reader = MarkupReader::new(input);
        let root = reader.expect_open()?;
        if root.name != "License" {
            return Err(LicenseError::malformed(format!(
                "expected <License>, found <{}>",
                root.name
            )));
        }
        let id = root
            .attrs
            .get("id")
            .ok_or_else(|| LicenseError::malformed("<License> has no id"))?;
        let id = LicenseId::parse(id)
            .map_err(|e| LicenseError::malformed(format!("license id {id:?}: {e}")))?;
        let mut builder = License::builder(id);

        if !root.empty {
            loop {
                let section = match reader.next()? {
                    Node::Close(name) if name == "License" => break,
                    Node::Open(el) => el,
                    other => {
                        return Err(LicenseError::malformed(format!(
                            "unexpected {other:?} in <License>"
                        )));
                    }
                };
                if section.empty {
                    continue;
                }
                loop {
                    let item = match reader.next()? {
                        Node::Close(name) if name == section.name => break,
                        Node::Open(el) => el,
                        other => {
                            return Err(LicenseError::malformed(format!(
                                "unexpected {other:?} in <{}>",
                                section.name
                            )));
                        }
                    };
                    builder = match section.name.as_str() {
                        "Features" => builder.feature(read_feature(&mut reader, &item)?),
                        "Fields" => builder.field(read_field(&mut reader, &item)?),
                        "Restrictions" => {
                            let r = self.restriction_from(&item)?;
                            reader.finish_childless(&item)?;
                            builder.restriction(r)
                        }
                        other => {
                            return Err(LicenseError::malformed(format!(
                                "unknown license section <{other}>"
                            )));
                        }
                    };
                }
            }
        }

        reader.expect_eof()?;
        builder.build()
    }
}

fn required_name(el: &Element) -> LicenseResult<String> {
    el.attrs
        .get("name")
        .map(str::to_string)
        .ok_or_else(|| LicenseError::malformed(format!("<{}> has no name", el.name)))
}

fn read_feature(reader: &mut MarkupReader<'_>, el: &Element) -> LicenseResult<Feature> {
    if el.name != "Feature" {
        return Err(LicenseError::malformed(format!("expected <Feature>, found <{}>", el.name)));
    }
    let mut feature = Feature::new(required_name(el)?);
    feature.description = el.attrs.get("description").map(str::to_string);
    let data = reader.text_of(el)?;
    if !el.empty {
        feature.data = Some(data);
    }
    Ok(feature)
}

fn read_field(reader: &mut MarkupReader<'_>, el: &Element) -> LicenseResult<Field> {
    if el.name != "Field" {
        return Err(LicenseError::malformed(format!("expected <Field>, found <{}>", el.name)));
    }
    let name = required_name(el)?;
    let raw = reader.text_of(el)?;
    let value = match el.attrs.get("type").unwrap_or("text") {
        "number" => FieldValue::Number(raw.trim().parse().map_err(|_| {
            LicenseError::malformed(format!("field {name}: {raw:?} is not a number"))
        })?),
        "text" => FieldValue::Text(raw),
        other => {
            return Err(LicenseError::malformed(format!("field {name}: unknown type {other:?}")));
        }
    };
    Ok(Field::new(name).with_value(value))
}
