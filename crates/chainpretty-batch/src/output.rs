//! Output destinations addressed by URL.
//!
//! ```text
//! print://[?file=<path>]                                   rendered text
//! discord://<host>/<path>                                  Discord webhook (https)
//! pubsubrawlogs://?project_id=<p>&topic=<t>[&dry_run=true] raw logs to Pub/Sub
//! ```

use std::{fmt, path::PathBuf, str::FromStr};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutputUrlError {
    #[error("invalid output URL '{url}': {reason}")]
    Invalid { url: String, reason: String },

    #[error("unknown output type '{0}' (expected print, discord or pubsubrawlogs)")]
    UnknownScheme(String),

    #[error("output '{scheme}' needs '{param}' in the query string")]
    MissingParam {
        scheme: &'static str,
        param: &'static str,
    },
}

/// One configured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    /// Rendered events, one per block of text, to a file or stdout
    Print { file: Option<PathBuf> },
    /// Rendered events packed into Discord webhook messages
    Discord { url: String },
    /// Raw logs of each transaction published as JSON
    PubSubRawLogs {
        project_id: String,
        topic: String,
        dry_run: bool,
    },
}

impl OutputSpec {
    pub fn scheme(&self) -> &'static str {
        match self {
            OutputSpec::Print { .. } => "print",
            OutputSpec::Discord { .. } => "discord",
            OutputSpec::PubSubRawLogs { .. } => "pubsubrawlogs",
        }
    }
}

impl FromStr for OutputSpec {
    type Err = OutputUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s).map_err(|e| OutputUrlError::Invalid {
            url: s.to_string(),
            reason: e.to_string(),
        })?;
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
        };

        match url.scheme() {
            "print" => Ok(OutputSpec::Print {
                file: param("file").map(PathBuf::from),
            }),
            "discord" => {
                let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| {
                    OutputUrlError::Invalid {
                        url: s.to_string(),
                        reason: "discord output needs a host".into(),
                    }
                })?;
                let mut target = format!("https://{host}{}", url.path());
                if let Some(query) = url.query() {
                    target.push('?');
                    target.push_str(query);
                }
                Ok(OutputSpec::Discord { url: target })
            }
            "pubsubrawlogs" => {
                let missing = |param| OutputUrlError::MissingParam {
                    scheme: "pubsubrawlogs",
                    param,
                };
                Ok(OutputSpec::PubSubRawLogs {
                    project_id: param("project_id").ok_or_else(|| missing("project_id"))?,
                    topic: param("topic").ok_or_else(|| missing("topic"))?,
                    dry_run: param("dry_run").map_or(false, |v| v.eq_ignore_ascii_case("true")),
                })
            }
            other => Err(OutputUrlError::UnknownScheme(other.to_string())),
        }
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSpec::Print { file: None } => f.write_str("print://"),
            OutputSpec::Print { file: Some(file) } => write!(f, "print://?file={}", file.display()),
            // the webhook token lives in the path
            OutputSpec::Discord { .. } => f.write_str("discord://<redacted>"),
            OutputSpec::PubSubRawLogs {
                project_id,
                topic,
                dry_run,
            } => write!(
                f,
                "pubsubrawlogs://?project_id={project_id}&topic={topic}&dry_run={dry_run}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_urls() {
        assert_eq!("print://".parse(), Ok(OutputSpec::Print { file: None }));
        assert_eq!(
            "print://?file=out.txt".parse(),
            Ok(OutputSpec::Print {
                file: Some(PathBuf::from("out.txt"))
            })
        );
    }

    #[test]
    fn discord_url_becomes_https() {
        let spec: OutputSpec = "discord://discord.com/api/webhooks/123/abc?wait=true"
            .parse()
            .unwrap();
        assert_eq!(
            spec,
            OutputSpec::Discord {
                url: "https://discord.com/api/webhooks/123/abc?wait=true".into()
            }
        );
        assert!(!spec.to_string().contains("abc"));
    }

    #[test]
    fn pubsub_query_parameters() {
        let spec: OutputSpec = "pubsubrawlogs://?project_id=acme&topic=raw-logs&dry_run=TRUE"
            .parse()
            .unwrap();
        assert_eq!(
            spec,
            OutputSpec::PubSubRawLogs {
                project_id: "acme".into(),
                topic: "raw-logs".into(),
                dry_run: true,
            }
        );
        let spec: OutputSpec = "pubsubrawlogs://?project_id=acme&topic=t".parse().unwrap();
        assert!(matches!(spec, OutputSpec::PubSubRawLogs { dry_run: false, .. }));

        assert_eq!(
            "pubsubrawlogs://?project_id=acme".parse::<OutputSpec>(),
            Err(OutputUrlError::MissingParam {
                scheme: "pubsubrawlogs",
                param: "topic"
            })
        );
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        assert_eq!(
            "kafka://broker".parse::<OutputSpec>(),
            Err(OutputUrlError::UnknownScheme("kafka".into()))
        );
        assert!(matches!(
            "not a url".parse::<OutputSpec>(),
            Err(OutputUrlError::Invalid { .. })
        ));
    }
}
