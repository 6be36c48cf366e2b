//! `att proxy`: manage proxy-subject relations.

use std::fmt::Write;

use anyhow::{Context, Result};
use att_core::{ProxyDirectory, ProxyRelation};
use att_db::Database;

use super::util::subject_key;

pub fn add(db: &mut Database, proxy: &str, delegating: &str, label: &str) -> Result<ProxyRelation> {
    let relation = ProxyRelation {
        proxy_subject: subject_key(proxy)?,
        delegating_subject: subject_key(delegating)?,
        label: label.trim().to_string(),
    };
    if relation.proxy_subject == relation.delegating_subject {
        anyhow::bail!("a subject cannot be its own proxy: {proxy}");
    }
    db.add_proxy(&relation).context("failed to save proxy")?;
    tracing::info!(
        proxy = %relation.proxy_subject,
        delegating = %relation.delegating_subject,
        "proxy registered"
    );
    Ok(relation)
}

/// Formats relations as an aligned table.
pub fn format_proxies(relations: &[ProxyRelation]) -> String {
    let mut output = String::new();
    if relations.is_empty() {
        writeln!(output, "No proxies registered.").unwrap();
        return output;
    }
    writeln!(output, "{:<24} {:<24} LABEL", "PROXY", "DELEGATING").unwrap();
    for relation in relations {
        writeln!(
            output,
            "{:<24} {:<24} {}",
            relation.proxy_subject.as_str(),
            relation.delegating_subject.as_str(),
            relation.label
        )
        .unwrap();
    }
    output
}

pub fn run_add(db: &mut Database, proxy: &str, delegating: &str, label: &str) -> Result<()> {
    let relation = add(db, proxy, delegating, label)?;
    println!(
        "{} now acts for {} as \"{}\"",
        relation.proxy_subject, relation.delegating_subject, relation.label
    );
    Ok(())
}

/// Registered proxies, optionally only those of one delegating employee.
pub fn list(db: &Database, delegating: Option<&str>) -> Result<Vec<ProxyRelation>> {
    let relations = db.list_proxies().context("failed to load proxies")?;
    let Some(raw) = delegating else {
        return Ok(relations);
    };
    let key = subject_key(raw)?;
    let directory = ProxyDirectory::new(relations);
    Ok(directory.proxies_of(&key).into_iter().cloned().collect())
}

pub fn run_list(db: &Database, delegating: Option<&str>, json: bool) -> Result<()> {
    let relations = list(db, delegating)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&relations)?);
    } else {
        print!("{}", format_proxies(&relations));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_add_and_list() {
        let mut db = Database::open_in_memory().unwrap();
        add(&mut db, "w-2", "ana@example.com", "Ana's helper #2").unwrap();
        add(&mut db, "w-1", "ana@example.com", " Ana's helper #1 ").unwrap();

        assert_snapshot!(format_proxies(&db.list_proxies().unwrap()), @r"
        PROXY                    DELEGATING               LABEL
        w-1                      ana@example.com          Ana's helper #1
        w-2                      ana@example.com          Ana's helper #2
        ");
    }

    #[test]
    fn test_list_filtered_by_delegating_employee() {
        let mut db = Database::open_in_memory().unwrap();
        add(&mut db, "w-3", "ana", "third").unwrap();
        add(&mut db, "w-1", "ana", "first").unwrap();
        add(&mut db, "w-2", "bo", "other").unwrap();

        let proxies: Vec<String> = list(&db, Some("ana"))
            .unwrap()
            .into_iter()
            .map(|r| r.proxy_subject.to_string())
            .collect();
        assert_eq!(proxies, vec!["w-1", "w-3"]);
        assert_eq!(list(&db, None).unwrap().len(), 3);
        assert!(list(&db, Some("cy")).unwrap().is_empty());
    }

    #[test]
    fn test_add_rejects_self_proxy() {
        let mut db = Database::open_in_memory().unwrap();
        let err = add(&mut db, "ana", "ana", "me").unwrap_err();
        assert!(err.to_string().contains("cannot be its own proxy"));
        assert!(db.list_proxies().unwrap().is_empty());
    }

    #[test]
    fn test_add_rejects_blank_subject() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(add(&mut db, "  ", "ana", "helper").is_err());
    }

    #[test]
    fn test_empty_list() {
        assert_snapshot!(format_proxies(&[]), @"No proxies registered.");
    }
}
