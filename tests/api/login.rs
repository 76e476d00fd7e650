use crate::helpers::{assert_is_redirect_to, spawn_app, TestUser};

#[tokio::test]
async fn an_error_flash_message_is_set_on_failure() {
    let app = spawn_app().await;

    let response = app
        .post_login(&serde_json::json!({
            "email": "nobody@example.com",
            "password": "random-password",
        }))
        .await;
    assert_is_redirect_to(&response, "/login");

    let html_page = app.get_html("/login").await;
    assert!(html_page.contains("Authentication failed"));

    // The flash message is gone after a reload.
    let html_page = app.get_html("/login").await;
    assert!(!html_page.contains("Authentication failed"));
}

#[tokio::test]
async fn a_failed_login_keeps_the_next_target() {
    let app = spawn_app().await;

    let response = app
        .post_login(&serde_json::json!({
            "email": &app.superuser.email,
            "password": "wrong-password",
            "next": "/admin/project/",
        }))
        .await;

    assert_is_redirect_to(&response, "/login?next=%2Fadmin%2Fproject%2F");
}

#[tokio::test]
async fn login_form_carries_the_next_target() {
    let app = spawn_app().await;

    let html_page = app.get_html("/login?next=/admin/user/").await;

    assert!(html_page.contains(r#"name="next" value="&#x2F;admin&#x2F;user&#x2F;""#));
}

#[tokio::test]
async fn successful_login_redirects_to_the_admin_index() {
    let app = spawn_app().await;

    let response = app.login_as(&app.superuser).await;
    assert_is_redirect_to(&response, "/admin/");

    let html_page = app.get_html("/admin/").await;
    assert!(html_page.contains("Welcome Test"));
}

#[tokio::test]
async fn successful_login_honors_a_local_next_target() {
    let app = spawn_app().await;

    let response = app
        .post_login(&serde_json::json!({
            "email": &app.superuser.email,
            "password": &app.superuser.password,
            "next": "/admin/project/?page=1",
        }))
        .await;

    assert_is_redirect_to(&response, "/admin/project/?page=1");
}

#[tokio::test]
async fn foreign_next_targets_are_ignored() {
    let app = spawn_app().await;

    let response = app
        .post_login(&serde_json::json!({
            "email": &app.superuser.email,
            "password": &app.superuser.password,
            "next": "https://example.org/phishing",
        }))
        .await;

    assert_is_redirect_to(&response, "/admin/");
}

#[tokio::test]
async fn inactive_users_cannot_log_in() {
    let app = spawn_app().await;
    let inactive = TestUser::generate()
        .store(&app.db_pool, &["user", "superuser"], false)
        .await;

    let response = app.login_as(&inactive).await;

    assert_is_redirect_to(&response, "/login");
}

#[tokio::test]
async fn logout_clears_session_state() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    let response = app.post_logout().await;
    assert_is_redirect_to(&response, "/");

    let html_page = app.get_html("/").await;
    assert!(html_page.contains("You have successfully logged out."));

    let response = app.get("/admin/").await;
    assert_is_redirect_to(&response, "/login?next=%2Fadmin%2F");
}
