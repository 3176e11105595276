//! Channel catalog
//!
//! The catalog maps channel names to channels and preserves the
//! configuration order, which is also the order advertised in the server
//! hello. It is built once at startup and read-only afterwards; only the
//! segment stores inside each channel keep growing.

use std::collections::HashMap;

use super::channel::{Channel, ChannelConfig};
use super::error::CatalogError;

/// Ordered collection of live channels
#[derive(Debug, Default)]
pub struct ChannelCatalog {
    names: Vec<String>,
    channels: HashMap<String, Channel>,
}

impl ChannelCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from the configured channel list
    ///
    /// `names` fixes the order; every listed channel must have a table in
    /// `configs`.
    pub fn from_config(
        names: &[String],
        configs: &HashMap<String, ChannelConfig>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for name in names {
            let config = configs
                .get(name)
                .ok_or_else(|| CatalogError::MissingChannelConfig(name.clone()))?;
            catalog.insert(Channel::from_config(name, config)?)?;
        }
        Ok(catalog)
    }

    /// Add a channel; fails on a duplicate name
    pub fn insert(&mut self, channel: Channel) -> Result<(), CatalogError> {
        let name = channel.name().to_owned();
        if self.channels.contains_key(&name) {
            return Err(CatalogError::DuplicateChannel(name));
        }
        self.names.push(name.clone());
        self.channels.insert(name, channel);
        Ok(())
    }

    /// Channel names in configuration order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Look up a channel by name
    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Resolve a subscription request: a named channel, or the first one
    pub fn resolve(&self, name: Option<&str>) -> Option<&Channel> {
        match name {
            Some(name) => self.get(name),
            None => self.names.first().and_then(|name| self.get(name)),
        }
    }

    /// Channels in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.names.iter().filter_map(|name| self.channels.get(name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::super::channel::Track;
    use super::super::format::{MediaKind, TrackFormat};
    use super::*;

    fn channel(name: &str) -> Channel {
        let video = Track::new(
            MediaKind::Video,
            180_000,
            "avc1.42e020".into(),
            vec![TrackFormat::from("720p")],
        );
        let audio = Track::new(
            MediaKind::Audio,
            96_000,
            "mp4a.40.2".into(),
            vec![TrackFormat::from("128k")],
        );
        Channel::new(name, "media", 90_000, video, audio)
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut catalog = ChannelCatalog::new();
        catalog.insert(channel("news")).unwrap();
        catalog.insert(channel("sports")).unwrap();

        assert_eq!(catalog.names(), &["news".to_owned(), "sports".to_owned()]);
        assert_eq!(catalog.len(), 2);
        let order: Vec<&str> = catalog.iter().map(Channel::name).collect();
        assert_eq!(order, vec!["news", "sports"]);
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut catalog = ChannelCatalog::new();
        catalog.insert(channel("news")).unwrap();

        assert!(matches!(
            catalog.insert(channel("news")),
            Err(CatalogError::DuplicateChannel(_))
        ));
    }

    #[test]
    fn test_resolve() {
        let mut catalog = ChannelCatalog::new();
        catalog.insert(channel("news")).unwrap();
        catalog.insert(channel("sports")).unwrap();

        assert_eq!(catalog.resolve(Some("sports")).map(Channel::name), Some("sports"));
        assert_eq!(catalog.resolve(None).map(Channel::name), Some("news"));
        assert!(catalog.resolve(Some("missing")).is_none());
        assert!(ChannelCatalog::new().resolve(None).is_none());
    }
}
