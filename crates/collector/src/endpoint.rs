use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid endpoint URL {input:?}: {reason}")]
    InvalidUrl { input: String, reason: String },
    #[error("endpoint {0:?} must use http or https")]
    UnsupportedScheme(String),
    #[error("endpoint {0:?} names no machine; use ID=URL")]
    MissingMachineId(String),
}

/// One machine's device access channel.
///
/// Parsed from `URL` (the machine id is the URL host) or `ID=URL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    machine_id: String,
    url: Url,
}

impl Endpoint {
    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    /// Base URL, always ending in `/`.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (explicit_id, raw_url) = match input.split_once('=') {
            Some((id, url)) if !id.contains("://") => (Some(id.trim()), url.trim()),
            _ => (None, input),
        };

        let mut url = Url::parse(raw_url).map_err(|err| EndpointError::InvalidUrl {
            input: input.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(EndpointError::UnsupportedScheme(input.to_string()));
        }

        let machine_id = explicit_id
            .or_else(|| raw_host(raw_url))
            .or_else(|| url.host_str())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| EndpointError::MissingMachineId(input.to_string()))?;

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self { machine_id, url })
    }
}

/// Host as written, before URL parsing lowercases it. Bracketed IPv6
/// hosts are left to the parsed URL.
fn raw_host(raw_url: &str) -> Option<&str> {
    let (_, rest) = raw_url.split_once("://")?;
    let authority = rest
        .split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if host_port.starts_with('[') {
        return None;
    }
    host_port.split(':').next().filter(|host| !host.is_empty())
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.machine_id, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_id_defaults_to_host() {
        let ep: Endpoint = "http://cnc_1:4840".parse().unwrap();
        assert_eq!(ep.machine_id(), "cnc_1");
        assert_eq!(ep.url().as_str(), "http://cnc_1:4840/");
    }

    #[test]
    fn explicit_machine_id() {
        let ep: Endpoint = "press_4=http://10.0.0.7:4840/plant".parse().unwrap();
        assert_eq!(ep.machine_id(), "press_4");
        assert_eq!(ep.url().as_str(), "http://10.0.0.7:4840/plant/");
        assert_eq!(ep.to_string(), "press_4=http://10.0.0.7:4840/plant/");
    }

    #[test]
    fn host_case_is_kept() {
        let ep: Endpoint = "http://CNC_1:4840/".parse().unwrap();
        assert_eq!(ep.machine_id(), "CNC_1");

        let ep: Endpoint = "http://op@Press_2:4840".parse().unwrap();
        assert_eq!(ep.machine_id(), "Press_2");

        let ep: Endpoint = "http://[::1]:4840".parse().unwrap();
        assert_eq!(ep.machine_id(), "[::1]");
    }

    #[test]
    fn explicit_id_may_contain_separators() {
        let ep: Endpoint = "line/1:a=http://10.0.0.7:4840".parse().unwrap();
        assert_eq!(ep.machine_id(), "line/1:a");
    }

    #[test]
    fn equals_sign_in_query_is_not_an_id() {
        let ep: Endpoint = "http://cnc_2:4840/?x=1".parse().unwrap();
        assert_eq!(ep.machine_id(), "cnc_2");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            "not a url".parse::<Endpoint>(),
            Err(EndpointError::InvalidUrl { .. })
        ));
        assert!(matches!(
            "opc.tcp://cnc_1:4840".parse::<Endpoint>(),
            Err(EndpointError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            "=http://cnc_1:4840".parse::<Endpoint>(),
            Err(EndpointError::MissingMachineId(_))
        ));
    }
}
