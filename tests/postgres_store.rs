//! Store tests against a live Postgres. They run only when `DATABASE_URL`
//! is set (directly or through `.env`) and are skipped otherwise.

use dotenv::dotenv;
use pretty_assertions::assert_eq;
use uuid::Uuid;

use taskvault::auth::hash_password;
use taskvault::models::{Task, TaskInput, TaskListQuery, TaskQuery, User};
use taskvault::store::{PgStore, TaskStore, UserStore};
use taskvault::AppError;

async fn connect() -> Option<PgStore> {
    dotenv().ok();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping postgres store test");
        return None;
    };
    let store = PgStore::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    store.migrate().await.expect("Failed to run migrations");
    Some(store)
}

/// Emails are randomised so reruns against the same database never collide.
fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4().simple())
}

fn user(email: &str) -> User {
    User::new(email, hash_password("secret123", 4).unwrap(), None, None)
}

fn task(owner: Uuid, description: &str, completed: bool) -> Task {
    Task::new(
        TaskInput {
            description: description.into(),
            completed,
        },
        owner,
    )
}

fn list_query(pairs: &[(&str, &str)]) -> TaskListQuery {
    let mut q = TaskQuery::default();
    for (key, value) in pairs {
        let value = Some(value.to_string());
        match *key {
            "completed" => q.completed = value,
            "sortBy" => q.sort_by = value,
            "limit" => q.limit = value,
            "skip" => q.skip = value,
            _ => unreachable!(),
        }
    }
    q.into()
}

#[actix_rt::test]
async fn test_pg_email_is_unique() {
    let Some(store) = connect().await else { return };
    let email = unique_email("unique");

    let first = user(&email);
    store.insert_user(&first).await.unwrap();

    let duplicate = store.insert_user(&user(&email)).await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

    let mut second = user(&unique_email("unique-other"));
    store.insert_user(&second).await.unwrap();
    second.email = email.clone();
    assert!(matches!(
        store.save_user(&second).await,
        Err(AppError::BadRequest(_))
    ));

    store.delete_user(first.id).await.unwrap();
    store.delete_user(second.id).await.unwrap();
}

#[actix_rt::test]
async fn test_pg_token_lifecycle() {
    let Some(store) = connect().await else { return };
    let email = unique_email("tokens");

    let mut u = user(&email);
    u.add_token("t1".into());
    u.add_token("t2".into());
    store.insert_user(&u).await.unwrap();

    let loaded = store
        .find_user_by_id_and_token(u.id, "t1")
        .await
        .unwrap()
        .expect("t1 should authenticate");
    assert_eq!(loaded.tokens, vec!["t1".to_string(), "t2".to_string()]);
    assert!(store
        .find_user_by_id_and_token(u.id, "t3")
        .await
        .unwrap()
        .is_none());

    let mut u = loaded;
    assert!(u.revoke_token("t1"));
    store.save_user(&u).await.unwrap();
    assert!(store.find_user_by_id_and_token(u.id, "t1").await.unwrap().is_none());
    assert!(store.find_user_by_id_and_token(u.id, "t2").await.unwrap().is_some());

    u.revoke_all_tokens();
    store.save_user(&u).await.unwrap();
    assert!(store.find_user_by_id_and_token(u.id, "t2").await.unwrap().is_none());

    let found = store.find_by_credentials(&email, "secret123").await.unwrap();
    assert_eq!(found.id, u.id);
    assert!(found.tokens.is_empty());
    assert!(matches!(
        store.find_by_credentials(&email, "wrong").await,
        Err(AppError::AuthFailed)
    ));

    store.delete_user(u.id).await.unwrap();
}

#[actix_rt::test]
async fn test_pg_tasks_are_owner_scoped() {
    let Some(store) = connect().await else { return };
    let alice = user(&unique_email("alice"));
    let bob = user(&unique_email("bob"));
    store.insert_user(&alice).await.unwrap();
    store.insert_user(&bob).await.unwrap();

    let mut t = task(alice.id, "alice's", false);
    store.insert_task(&t).await.unwrap();

    assert!(store.find_task(alice.id, t.id).await.unwrap().is_some());
    assert!(store.find_task(bob.id, t.id).await.unwrap().is_none());
    assert!(store
        .list_tasks(bob.id, &TaskListQuery::default())
        .await
        .unwrap()
        .is_empty());
    assert!(store.delete_task(bob.id, t.id).await.unwrap().is_none());

    let mut stolen = t.clone();
    stolen.owner = bob.id;
    assert!(matches!(
        store.save_task(&stolen).await,
        Err(AppError::NotFound(_))
    ));

    t.completed = true;
    store.save_task(&t).await.unwrap();
    let reloaded = store.find_task(alice.id, t.id).await.unwrap().unwrap();
    assert!(reloaded.completed);
    assert_eq!(reloaded.owner, alice.id);

    let deleted = store.delete_task(alice.id, t.id).await.unwrap();
    assert_eq!(deleted.map(|d| d.id), Some(t.id));
    assert!(store.find_task(alice.id, t.id).await.unwrap().is_none());

    store.delete_user(alice.id).await.unwrap();
    store.delete_user(bob.id).await.unwrap();
}

#[actix_rt::test]
async fn test_pg_delete_user_cascades_to_tasks() {
    let Some(store) = connect().await else { return };
    let doomed = user(&unique_email("doomed"));
    let survivor = user(&unique_email("survivor"));
    store.insert_user(&doomed).await.unwrap();
    store.insert_user(&survivor).await.unwrap();
    store.insert_task(&task(doomed.id, "one", false)).await.unwrap();
    store.insert_task(&task(doomed.id, "two", true)).await.unwrap();
    store.insert_task(&task(survivor.id, "kept", false)).await.unwrap();

    let removed = store.delete_user(doomed.id).await.unwrap();
    assert_eq!(removed.map(|u| u.id), Some(doomed.id));
    assert!(store.find_user_by_id(doomed.id).await.unwrap().is_none());
    assert!(store.delete_user(doomed.id).await.unwrap().is_none());
    assert!(store
        .list_tasks(doomed.id, &TaskListQuery::default())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        store
            .list_tasks(survivor.id, &TaskListQuery::default())
            .await
            .unwrap()
            .len(),
        1
    );

    store.delete_user(survivor.id).await.unwrap();
}

#[actix_rt::test]
async fn test_pg_list_filter_sort_and_paging() {
    let Some(store) = connect().await else { return };
    let owner = user(&unique_email("lists"));
    store.insert_user(&owner).await.unwrap();
    for (description, completed) in [("b", true), ("d", false), ("a", false), ("c", true)] {
        store
            .insert_task(&task(owner.id, description, completed))
            .await
            .unwrap();
    }

    let names = |tasks: Vec<Task>| -> Vec<String> {
        tasks.into_iter().map(|t| t.description).collect()
    };

    let cases = vec![
        (vec![], vec!["b", "d", "a", "c"]),
        (
            vec![("completed", "true"), ("sortBy", "description:asc")],
            vec!["b", "c"],
        ),
        (
            vec![("completed", "false"), ("sortBy", "description:desc")],
            vec!["d", "a"],
        ),
        (
            vec![("sortBy", "description:asc"), ("limit", "2"), ("skip", "1")],
            vec!["b", "c"],
        ),
        (vec![("sortBy", "description:asc"), ("skip", "3")], vec!["d"]),
        (vec![("skip", "10")], vec![]),
        (
            vec![("sortBy", "description"), ("limit", "18446744073709551615")],
            vec!["a", "b", "c", "d"],
        ),
        (vec![("skip", "18446744073709551615")], vec![]),
    ];

    for (pairs, expected) in cases {
        let listed = store
            .list_tasks(owner.id, &list_query(&pairs))
            .await
            .unwrap_or_else(|e| panic!("query {:?} failed: {}", pairs, e));
        assert_eq!(names(listed), expected, "query: {:?}", pairs);
    }

    store.delete_user(owner.id).await.unwrap();
}
