use crate::helpers::{assert_is_redirect_to, spawn_app};

const ADMIN_PAGES: [&str; 6] = [
    "/admin/",
    "/admin/custom/",
    "/admin/role/",
    "/admin/user/",
    "/admin/project/",
    "/admin/project/new",
];

#[tokio::test]
async fn anonymous_visitors_are_sent_to_the_login_form() {
    let app = spawn_app().await;

    for page in ADMIN_PAGES {
        let response = app.get(page).await;

        let expected = format!("/login?next={}", urlencoding::encode(page));
        assert_is_redirect_to(&response, &expected);
    }
}

#[tokio::test]
async fn anonymous_mutations_are_rejected() {
    let app = spawn_app().await;
    app.insert_projects(&[10]).await;

    let response = app
        .post_form("/admin/project/new", &[("name", "Apollo"), ("cost", "10")])
        .await;
    assert_eq!(response.status().as_u16(), 303);

    let count = sqlx::query_scalar!(r#"SELECT COUNT(*) AS "count!" FROM project"#)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn users_without_the_superuser_role_are_forbidden() {
    let app = spawn_app().await;
    let response = app.login_as(&app.plain_user).await;
    assert_is_redirect_to(&response, "/admin/");

    for page in ADMIN_PAGES {
        let response = app.get(page).await;
        assert_eq!(response.status().as_u16(), 403, "{}", page);
    }
}

#[tokio::test]
async fn superusers_can_open_every_admin_page() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    for page in ADMIN_PAGES {
        let response = app.get(page).await;
        assert_eq!(response.status().as_u16(), 200, "{}", page);
    }
}

#[tokio::test]
async fn deactivating_a_logged_in_superuser_revokes_access() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    sqlx::query!(
        r#"UPDATE "user" SET active = FALSE WHERE id = $1"#,
        app.superuser.user_id
    )
    .execute(&app.db_pool)
    .await
    .unwrap();

    let response = app.get("/admin/project/").await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn the_menu_lists_every_admin_view() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    let html_page = app.get_html("/admin/").await;

    for (label, url) in [
        ("Roles", "/admin/role/"),
        ("Users", "/admin/user/"),
        ("Custom view", "/admin/custom/"),
        ("Projects", "/admin/project/"),
    ] {
        assert!(html_page.contains(label));
        assert!(html_page.contains(&format!("href=\"{}\"", url)));
    }
}
