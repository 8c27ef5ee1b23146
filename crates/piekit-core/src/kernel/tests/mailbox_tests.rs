#![cfg(test)]

use std::time::Duration;

use crate::kernel::directory::ManagerDirectory;
use crate::kernel::error::Error;
use crate::kernel::mailbox::Mailbox;
use crate::registry::reference::ReferenceManager;

type Results = ReferenceManager<u32>;

fn directory() -> ManagerDirectory {
    let mut directory = ManagerDirectory::new();
    directory.register(Results::new("results")).unwrap();
    directory
}

#[tokio::test]
async fn test_worker_jobs_are_applied_by_owner() {
    let directory = directory();
    let mut mailbox = Mailbox::new();

    let mut workers = Vec::new();
    for i in 0..4u32 {
        let sender = mailbox.sender();
        workers.push(tokio::spawn(async move {
            sender
                .post(move |managers| {
                    managers.with_mut::<Results, _>("results", |results| {
                        results.add(&format!("job{i}"), i * 10, None)?;
                        Ok(())
                    })
                })
                .is_ok()
        }));
    }
    for worker in workers {
        assert!(worker.await.unwrap());
    }

    // Nothing is applied until the owner drains
    assert_eq!(mailbox.pending(), 4);
    directory
        .with::<Results, _>("results", |results| {
            assert_eq!(results.registry().len(), 0);
            Ok(())
        })
        .unwrap();

    assert_eq!(mailbox.drain(&directory), 4);
    directory
        .with::<Results, _>("results", |results| {
            assert_eq!(*results.get("job3", None)?, 30);
            assert_eq!(results.registry().len(), 4);
            Ok(())
        })
        .unwrap();
}

#[tokio::test]
async fn test_apply_next_waits_for_a_job() {
    let directory = directory();
    let mut mailbox = Mailbox::new();
    let sender = mailbox.sender();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = sender.post(|managers| {
            managers.with_mut::<Results, _>("results", |results| {
                results.add("late", 1, None)?;
                Ok(())
            })
        });
    });

    mailbox.apply_next(&directory).await.unwrap();
    directory
        .with::<Results, _>("results", |results| {
            assert!(results.contains("late", None));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_failing_job_does_not_stop_drain() {
    let directory = directory();
    let mut mailbox = Mailbox::new();
    let sender = mailbox.sender();

    sender.post(|_| Err(Error::Other("worker failed".to_string()))).unwrap();
    sender
        .post(|managers| {
            managers.with_mut::<Results, _>("results", |results| {
                results.add("after", 2, None)?;
                Ok(())
            })
        })
        .unwrap();

    assert_eq!(mailbox.drain(&directory), 2);
    assert_eq!(mailbox.pending(), 0);
    directory
        .with::<Results, _>("results", |results| {
            assert!(results.contains("after", None));
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_post_fails_once_mailbox_is_dropped() {
    let mailbox = Mailbox::new();
    let sender = mailbox.sender();
    drop(mailbox);
    assert!(sender.post(|_| Ok(())).is_err());
}
