//! Form collection
//!
//! A submitted tasting form is a [`FormData`]: an ordered multimap of field
//! names to values, the way an html form submits radio buttons (one value),
//! checkboxes (one value per checked box) and text inputs.
//!
//! - [`collect`] turns a form into a new [`Entry`]
//! - [`apply_edit`] merges a collected form over an existing entry
//! - [`fill_form`] is the inverse of `collect`, used to load an entry back
//!   into its form for editing

use std::path::Path;

use snafu::prelude::*;

use crate::{
    Result,
    entry::{Entry, SINGLE_SELECT_FIELDS, WineType},
    error::{IoSnafu, ValidationSnafu},
    photo::{ShrinkOptions, data_url_from_bytes, guess_mime, shrink_data_url},
};

/// Submitted form fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `key=value` pairs. Repeated keys accumulate values.
    pub fn from_pairs<I, T>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut form = Self::new();
        for pair in pairs {
            let (key, value) = parse_pair(pair.as_ref())?;
            form.append(key, value);
        }
        Ok(form)
    }

    /// Replaces all values of `name` with a single value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.fields.retain(|(key, _)| *key != name);
        self.fields.push((name, value.into()));
        self
    }

    /// Adds a value to `name`, keeping existing values
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// First value of `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All values of `name`, in submission order
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(key, _)| key == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    fn checked(&self, name: &str) -> Vec<String> {
        self.get_all(name)
            .into_iter()
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

/// Splits `key=value`. The key is trimmed; the value is kept as given.
pub fn parse_pair(input: &str) -> Result<(String, String)> {
    let (key, value) = input.split_once('=').context(ValidationSnafu {
        message: format!("invalid field (expected key=value): {input}"),
    })?;
    let key = key.trim();
    ensure!(
        !key.is_empty(),
        ValidationSnafu {
            message: format!("invalid field key: {input}"),
        }
    );
    Ok((key.to_string(), value.to_string()))
}

/// Photo file submitted with a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl PhotoUpload {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Reads a photo file, guessing the mime type from its extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).context(IoSnafu { path })?;
        Ok(Self::new(bytes, guess_mime(path)))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What to do with the photo when a form is submitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PhotoInput {
    /// No file chosen. New entries get no photo; edits keep the stored one.
    #[default]
    Keep,
    /// Clear the stored photo
    Remove,
    Upload(PhotoUpload),
}

impl PhotoInput {
    /// Upload with a non-empty file, if any
    fn upload(&self) -> Option<&PhotoUpload> {
        match self {
            Self::Upload(upload) if !upload.is_empty() => Some(upload),
            _ => None,
        }
    }
}

fn embed_photo(upload: &PhotoUpload) -> String {
    let data_url = data_url_from_bytes(&upload.bytes, &upload.mime);
    shrink_data_url(&data_url, &ShrinkOptions::form())
}

/// Builds a new entry from a submitted form.
///
/// Unselected single-select fields are empty strings, unchecked lists are
/// empty. Only the fruit lists for `kind` are read.
pub fn collect(form: &FormData, kind: WineType, photo: &PhotoInput) -> Entry {
    let mut entry = Entry::new(kind);
    entry.name = form.text("name").trim().to_string();
    entry.notes = form.text("notes");

    for field in SINGLE_SELECT_FIELDS {
        if let Some(slot) = entry.single_select_mut(field) {
            *slot = form.text(field);
        }
    }

    entry.set_nose_fruit(form.checked(kind.nose_fruit_key()));
    entry.smell_other = form.checked("smell_other");
    entry.smell_other_text = form.text("smell_other_text");

    entry.set_palate_fruit(form.checked(kind.palate_fruit_key()));
    entry.palate_other = form.checked("palate_other");
    entry.palate_other_text = form.text("palate_other_text");

    if let Some(upload) = photo.upload() {
        entry.photo = embed_photo(upload);
    }
    entry
}

/// Merges a collected form over an existing entry.
///
/// Descriptors, name and notes come from `collected`. Identity, type,
/// creation time, like state, public flag and unknown fields come from
/// `existing`. The photo is replaced by a new upload, cleared by
/// [`PhotoInput::Remove`], and otherwise kept.
pub fn apply_edit(existing: &Entry, collected: Entry, photo: &PhotoInput) -> Entry {
    let photo = match photo {
        PhotoInput::Remove => String::new(),
        input if input.upload().is_some() => collected.photo.clone(),
        _ => existing.photo.clone(),
    };
    let mut merged = Entry {
        id: existing.id.clone(),
        kind: existing.kind,
        date: existing.date,
        likes: existing.likes,
        liked: existing.liked,
        public: existing.public,
        extra: existing.extra.clone(),
        photo,
        ..collected
    };
    merged.normalize();
    merged
}

/// Form values for an entry, so it can be edited and re-submitted.
pub fn fill_form(entry: &Entry) -> FormData {
    let mut form = FormData::new();
    form.set("name", entry.name.as_str());
    for field in SINGLE_SELECT_FIELDS {
        if let Some(value) = entry.single_select(field)
            && !value.is_empty()
        {
            form.set(field, value);
        }
    }
    for value in entry.nose_fruit() {
        form.append(entry.kind.nose_fruit_key(), value.as_str());
    }
    for value in &entry.smell_other {
        form.append("smell_other", value.as_str());
    }
    if !entry.smell_other_text.is_empty() {
        form.set("smell_other_text", entry.smell_other_text.as_str());
    }
    for value in entry.palate_fruit() {
        form.append(entry.kind.palate_fruit_key(), value.as_str());
    }
    for value in &entry.palate_other {
        form.append("palate_other", value.as_str());
    }
    if !entry.palate_other_text.is_empty() {
        form.set("palate_other_text", entry.palate_other_text.as_str());
    }
    form.set("notes", entry.notes.as_str());
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chablis_form() -> FormData {
        let mut form = FormData::new();
        form.set("name", "  Chablis ")
            .set("hue", "pale straw")
            .append("smell_fresh", "citrus")
            .append("smell_fresh", "green apple")
            .append("smell_fruit_red", "cherry");
        form
    }

    #[test]
    fn collect_defaults_and_type_lists() {
        let entry = collect(&chablis_form(), WineType::White, &PhotoInput::Keep);
        assert_eq!(entry.name, "Chablis");
        assert_eq!(entry.hue, "pale straw");
        assert_eq!(entry.body, "");
        assert_eq!(
            entry.smell_fresh,
            Some(vec!["citrus".to_string(), "green apple".to_string()])
        );
        // red list on a white form is ignored
        assert!(entry.smell_fruit_red.is_none());
        assert_eq!(entry.palate_fresh, Some(vec![]));
        assert!(entry.photo.is_empty());
        assert_eq!(entry.likes, 0);
    }

    #[test]
    fn empty_upload_is_no_photo() {
        let photo = PhotoInput::Upload(PhotoUpload::new(Vec::new(), "image/png"));
        let entry = collect(&chablis_form(), WineType::White, &photo);
        assert!(entry.photo().is_none());
    }

    #[test]
    fn edit_preserves_identity_and_engagement() {
        let mut existing = collect(&chablis_form(), WineType::White, &PhotoInput::Keep);
        existing.likes = 4;
        existing.liked = true;
        existing.public = true;
        existing.photo = "data:image/jpeg;base64,AAAA".into();

        let mut form = FormData::new();
        form.set("name", "Chablis 1er Cru").set("finish", "long");
        let collected = collect(&form, WineType::White, &PhotoInput::Keep);
        let merged = apply_edit(&existing, collected, &PhotoInput::Keep);

        assert_eq!(merged.id, existing.id);
        assert_eq!(merged.date, existing.date);
        assert_eq!(merged.likes, 4);
        assert!(merged.liked);
        assert!(merged.public);
        assert_eq!(merged.name, "Chablis 1er Cru");
        assert_eq!(merged.finish, "long");
        assert_eq!(merged.hue, "");
        assert_eq!(merged.photo, existing.photo);
    }

    #[test]
    fn edit_remove_photo_clears_it() {
        let mut existing = Entry::new(WineType::Red);
        existing.photo = "data:image/jpeg;base64,AAAA".into();
        let collected = collect(&FormData::new(), WineType::Red, &PhotoInput::Remove);
        let merged = apply_edit(&existing, collected, &PhotoInput::Remove);
        assert!(merged.photo.is_empty());
    }

    #[test]
    fn fill_form_round_trips_through_collect() {
        let original = collect(&chablis_form(), WineType::White, &PhotoInput::Keep);
        let form = fill_form(&original);
        let again = collect(&form, WineType::White, &PhotoInput::Keep);
        let merged = apply_edit(&original, again, &PhotoInput::Keep);
        assert_eq!(merged, original);
    }

    #[test]
    fn parse_pairs() {
        let form = FormData::from_pairs(["hue=ruby", "smell_other=spice", "smell_other=earth"])
            .expect("parse");
        assert_eq!(form.get("hue"), Some("ruby"));
        assert_eq!(form.get_all("smell_other"), vec!["spice", "earth"]);
        assert!(FormData::from_pairs(["novalue"]).is_err());
        assert!(FormData::from_pairs(["=x"]).is_err());
    }
}
