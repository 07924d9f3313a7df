use crate::cli::{IndexArgs, PendingArgs, RootArgs};
use crate::indexer::IndexOptions;
use crate::dates;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Settings for the `index` command.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub root: PathBuf,
    pub input: PathBuf,
    pub options: IndexOptions,
    pub reset_index: bool,
}

/// Settings for the `pending` command.
#[derive(Debug, Clone)]
pub struct PendingConfig {
    pub root: PathBuf,
    pub id_pattern: String,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl RootArgs {
    pub fn root_folder(&self) -> PathBuf {
        expand_tilde(&self.root)
    }
}

impl IndexConfig {
    pub fn from_args(args: IndexArgs) -> anyhow::Result<Self> {
        let folder_layout = args.folder_layout.trim().to_string();
        if folder_layout.is_empty() {
            anyhow::bail!("--folder-layout must not be empty (use 'none' for no date folders)");
        }
        let root = args.root.root_folder();
        Ok(Self {
            input: expand_tilde(&args.input),
            options: IndexOptions {
                folder_layout,
                lowercase: args.lowercase,
                sync_root: root.clone(),
            },
            root,
            reset_index: args.reset_index,
        })
    }
}

impl PendingConfig {
    pub fn from_args(args: PendingArgs) -> anyhow::Result<Self> {
        let since = args
            .since
            .as_deref()
            .map(parse_date_or_interval)
            .transpose()?;
        let until = args
            .until
            .as_deref()
            .map(parse_date_or_interval)
            .transpose()?;
        if let (Some(since), Some(until)) = (since, until) {
            if since > until {
                anyhow::bail!("--since ({}) is after --until ({})", since, until);
            }
        }
        Ok(Self {
            root: args.root.root_folder(),
            id_pattern: args.id,
            since,
            until,
        })
    }
}

/// Parse a `--since`/`--until` value.
///
/// Either a look-back interval counted from now (`30d` days, `6w` weeks)
/// or any absolute form `dates::parse_date` accepts. Absolute values are
/// UTC, matching what the store persists.
pub(crate) fn parse_date_or_interval(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let value = s.trim();
    let interval = match value.char_indices().last() {
        Some((at, 'd')) => value[..at].parse::<i64>().ok().map(chrono::Duration::days),
        Some((at, 'w')) => value[..at].parse::<i64>().ok().map(chrono::Duration::weeks),
        _ => None,
    };
    if let Some(span) = interval {
        return Ok(Utc::now() - span);
    }
    dates::parse_date(value).ok_or_else(|| {
        anyhow::anyhow!(
            "Unrecognised date '{}': use 2021-03-04, 2021-03-04T10:00:00 or an interval such as 30d or 6w",
            s
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_root_folder_expands_home() {
        let args = RootArgs {
            root: "~/Photos/sync".to_string(),
        };
        match dirs::home_dir() {
            Some(home) => assert_eq!(args.root_folder(), home.join("Photos/sync")),
            None => assert_eq!(args.root_folder(), PathBuf::from("~/Photos/sync")),
        }
        assert_eq!(expand_tilde("/srv/photos"), PathBuf::from("/srv/photos"));
        assert_eq!(expand_tilde("photos/~x"), PathBuf::from("photos/~x"));
    }

    #[test]
    fn test_absolute_dates_are_utc() {
        let day = parse_date_or_interval("2021-03-04").unwrap();
        assert_eq!(day.to_rfc3339(), "2021-03-04T00:00:00+00:00");
        let moment = parse_date_or_interval(" 2021-03-04T10:15:00 ").unwrap();
        assert_eq!(moment.to_rfc3339(), "2021-03-04T10:15:00+00:00");
    }

    #[test]
    fn test_intervals_count_back_from_now() {
        let before = Utc::now();
        let days = parse_date_or_interval("30d").unwrap();
        let weeks = parse_date_or_interval("2w").unwrap();
        let after = Utc::now();
        let month = chrono::Duration::days(30);
        let fortnight = chrono::Duration::weeks(2);
        assert!(before - month <= days && days <= after - month);
        assert!(before - fortnight <= weeks && weeks <= after - fortnight);
    }

    #[test]
    fn test_unrecognised_dates_rejected() {
        for bad in ["", "d", "yesterday", "3x", "2021-13-01"] {
            assert!(parse_date_or_interval(bad).is_err(), "{bad:?} parsed");
        }
    }

    fn parse(args: &[&str]) -> crate::cli::Command {
        let mut argv = vec!["gphotos-sync-rs"];
        argv.extend_from_slice(args);
        crate::cli::Cli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn test_index_config() {
        let crate::cli::Command::Index(args) = parse(&[
            "index",
            "--root",
            "/photos",
            "--input",
            "/tmp/items.json",
            "--folder-layout",
            "%Y",
            "--reset-index",
        ]) else {
            panic!("expected index command");
        };
        let cfg = IndexConfig::from_args(args).unwrap();
        assert_eq!(cfg.root, PathBuf::from("/photos"));
        assert_eq!(cfg.input, PathBuf::from("/tmp/items.json"));
        assert_eq!(cfg.options.folder_layout, "%Y");
        assert_eq!(cfg.options.sync_root, cfg.root);
        assert!(!cfg.options.lowercase);
        assert!(cfg.reset_index);
    }

    #[test]
    fn test_index_config_rejects_blank_layout() {
        let crate::cli::Command::Index(args) = parse(&[
            "index",
            "--root",
            "/p",
            "--input",
            "x.json",
            "--folder-layout",
            " ",
        ]) else {
            panic!("expected index command");
        };
        assert!(IndexConfig::from_args(args).is_err());
    }

    #[test]
    fn test_pending_config_dates() {
        let crate::cli::Command::Pending(args) = parse(&[
            "pending",
            "--root",
            "/p",
            "--since",
            "2020-01-01",
            "--until",
            "2020-12-31T23:59:59",
        ]) else {
            panic!("expected pending command");
        };
        let cfg = PendingConfig::from_args(args).unwrap();
        assert!(cfg.since.unwrap() < cfg.until.unwrap());
        assert_eq!(cfg.id_pattern, "%");
    }

    #[test]
    fn test_pending_config_rejects_inverted_range() {
        let crate::cli::Command::Pending(args) = parse(&[
            "pending",
            "--root",
            "/p",
            "--since",
            "2021-01-01",
            "--until",
            "2020-01-01",
        ]) else {
            panic!("expected pending command");
        };
        assert!(PendingConfig::from_args(args).is_err());
    }
}
