use crate::helpers::{assert_is_redirect_to, spawn_app, TestApp, TestUser};

async fn project_id(app: &TestApp, name: &str) -> Option<i32> {
    sqlx::query_scalar!("SELECT id FROM project WHERE name = $1", name)
        .fetch_optional(&app.db_pool)
        .await
        .unwrap()
}

async fn role_id(app: &TestApp, name: &str) -> i32 {
    sqlx::query_scalar!("SELECT id FROM role WHERE name = $1", name)
        .fetch_one(&app.db_pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn creating_a_project_redirects_to_the_listing() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    let response = app
        .post_form("/admin/project/new", &[("name", "Apollo"), ("cost", "42")])
        .await;
    assert_is_redirect_to(&response, "/admin/project/");

    let html = app.get_html("/admin/project/").await;
    assert!(html.contains("Record was successfully created."));

    let cost = sqlx::query_scalar!("SELECT cost FROM project WHERE name = 'Apollo'")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(cost, 42);
}

#[tokio::test]
async fn invalid_projects_are_rejected_with_a_400() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    let test_cases = [
        (vec![("name", ""), ("cost", "10")], "empty name"),
        (vec![("name", "Apollo"), ("cost", "ten")], "non numeric cost"),
        (vec![("name", "Apollo"), ("cost", "-5")], "negative cost"),
        (vec![("name", "Apollo")], "missing cost"),
    ];

    for (body, description) in test_cases {
        let response = app.post_form("/admin/project/new", &body).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload had {}.",
            description
        );
    }

    assert_eq!(project_id(&app, "Apollo").await, None);
}

#[tokio::test]
async fn duplicate_project_names_are_reported_on_the_field() {
    let app = spawn_app().await;
    app.insert_projects(&[10]).await;
    app.login_as_superuser().await;

    let response = app
        .post_form("/admin/project/new", &[("name", "P01"), ("cost", "20")])
        .await;

    assert_eq!(response.status().as_u16(), 400);
    assert!(response.text().await.unwrap().contains("Already in use."));
}

#[tokio::test]
async fn editing_a_project_saves_it() {
    let app = spawn_app().await;
    app.insert_projects(&[10]).await;
    app.login_as_superuser().await;
    let id = project_id(&app, "P01").await.unwrap();

    let html = app.get_html(&format!("/admin/project/edit/{}", id)).await;
    assert!(html.contains(r#"value="P01""#));

    let response = app
        .post_form(
            &format!("/admin/project/edit/{}", id),
            &[("name", "Gemini"), ("cost", "77")],
        )
        .await;
    assert_is_redirect_to(&response, "/admin/project/");

    assert_eq!(project_id(&app, "Gemini").await, Some(id));
}

#[tokio::test]
async fn missing_records_are_a_404() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    assert_eq!(app.get("/admin/project/edit/9999").await.status().as_u16(), 404);
    assert_eq!(app.get("/admin/project/details/9999").await.status().as_u16(), 404);

    let response = app
        .post_form("/admin/project/edit/9999", &[("name", "Gemini"), ("cost", "1")])
        .await;
    assert_eq!(response.status().as_u16(), 404);

    let response = app.post_form("/admin/project/delete/9999", &[("", "")]).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn deleting_a_project_removes_it() {
    let app = spawn_app().await;
    app.insert_projects(&[10]).await;
    app.login_as_superuser().await;
    let id = project_id(&app, "P01").await.unwrap();

    let response = app
        .post_form(&format!("/admin/project/delete/{}", id), &[("", "")])
        .await;
    assert_is_redirect_to(&response, "/admin/project/");

    assert_eq!(project_id(&app, "P01").await, None);
    let html = app.get_html("/admin/project/").await;
    assert!(html.contains("Record was successfully deleted."));
}

#[tokio::test]
async fn details_show_every_column() {
    let app = spawn_app().await;
    app.insert_projects(&[10]).await;
    app.login_as_superuser().await;
    let id = project_id(&app, "P01").await.unwrap();

    let html = app.get_html(&format!("/admin/project/details/{}", id)).await;

    assert!(html.contains("Name: P01; Cost : 10"));
    assert!(html.contains("<td>P01</td>"));
    assert!(html.contains("<td>10</td>"));
}

#[tokio::test]
async fn inline_edits_only_touch_editable_columns() {
    let app = spawn_app().await;
    app.insert_projects(&[10]).await;
    app.login_as_superuser().await;
    let id = project_id(&app, "P01").await.unwrap();
    let path = format!("/admin/project/update/{}", id);

    let response = app
        .api_client
        .post(&format!("{}{}", &app.address, path))
        .header("X-Requested-With", "XMLHttpRequest")
        .form(&[("name", "cost"), ("value", "99")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "Record was successfully saved.");

    let cost = sqlx::query_scalar!("SELECT cost FROM project WHERE id = $1", id)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(cost, 99);

    let response = app.post_form(&path, &[("name", "id"), ("value", "5")]).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .post_form(&path, &[("name", "cost"), ("value", "lots")])
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn inline_edits_from_the_listing_form_redirect_back_with_a_flash() {
    let app = spawn_app().await;
    app.insert_projects(&[10]).await;
    app.login_as_superuser().await;
    let id = project_id(&app, "P01").await.unwrap();

    let response = app
        .post_form(
            &format!("/admin/project/update/{}", id),
            &[("name", "cost"), ("value", "77")],
        )
        .await;
    assert_is_redirect_to(&response, "/admin/project/");

    let html = app.get_html("/admin/project/").await;
    assert!(html.contains("Record was successfully saved."));
    assert!(html.contains("<strong>77</strong>"));
}

#[tokio::test]
async fn a_created_superuser_can_log_in() {
    let app = spawn_app().await;
    app.login_as_superuser().await;
    let user_role = role_id(&app, "user").await.to_string();
    let superuser_role = role_id(&app, "superuser").await.to_string();

    let response = app
        .post_form(
            "/admin/user/new",
            &[
                ("first_name", "Ursula"),
                ("last_name", "Le Guin"),
                ("email", "ursula@example.com"),
                ("password", "earthsea-1968"),
                ("active", "y"),
                ("roles", user_role.as_str()),
                ("roles", superuser_role.as_str()),
            ],
        )
        .await;
    assert_is_redirect_to(&response, "/admin/user/");

    let roles = sqlx::query_scalar!(
        r#"
        SELECT r.name::TEXT AS "name!"
        FROM roles_users ru
        JOIN role r ON r.id = ru.role_id
        JOIN "user" u ON u.id = ru.user_id
        WHERE u.email = 'ursula@example.com'
        ORDER BY r.name
        "#,
    )
    .fetch_all(&app.db_pool)
    .await
    .unwrap();
    assert_eq!(roles, vec!["superuser", "user"]);

    app.post_logout().await;
    let newcomer = TestUser {
        user_id: 0,
        email: "ursula@example.com".into(),
        password: "earthsea-1968".into(),
    };
    let response = app.login_as(&newcomer).await;
    assert_is_redirect_to(&response, "/admin/");
}

#[tokio::test]
async fn creating_a_user_requires_a_password() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    let response = app
        .post_form(
            "/admin/user/new",
            &[("email", "nopass@example.com"), ("active", "y")],
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
    assert!(response.text().await.unwrap().contains("Password is required."));
}

#[tokio::test]
async fn editing_a_user_with_a_blank_password_keeps_the_old_one() {
    let app = spawn_app().await;
    app.login_as_superuser().await;
    let user_role = role_id(&app, "user").await.to_string();

    let response = app
        .post_form(
            &format!("/admin/user/edit/{}", app.plain_user.user_id),
            &[
                ("first_name", "Renamed"),
                ("email", app.plain_user.email.as_str()),
                ("password", ""),
                ("active", "y"),
                ("roles", user_role.as_str()),
            ],
        )
        .await;
    assert_is_redirect_to(&response, "/admin/user/");

    let first_name = sqlx::query_scalar!(
        r#"SELECT first_name FROM "user" WHERE id = $1"#,
        app.plain_user.user_id
    )
    .fetch_one(&app.db_pool)
    .await
    .unwrap();
    assert_eq!(first_name.as_deref(), Some("Renamed"));

    app.post_logout().await;
    let response = app.login_as(&app.plain_user).await;
    assert_is_redirect_to(&response, "/admin/");
}

#[tokio::test]
async fn unknown_roles_are_rejected() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    let response = app
        .post_form(
            "/admin/user/new",
            &[
                ("email", "someone@example.com"),
                ("password", "long-enough-password"),
                ("roles", "9999"),
            ],
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn users_can_be_searched_by_email() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    let needle = app.plain_user.email.split('@').next().unwrap().to_string();
    let html = app
        .get_html(&format!("/admin/user/?search={}", needle))
        .await;

    assert!(html.contains(&app.plain_user.email));
    assert_eq!(html.matches(r#"class="list-buttons-column""#).count(), 1);
}

#[tokio::test]
async fn deleting_a_role_detaches_it_from_users() {
    let app = spawn_app().await;
    app.login_as_superuser().await;
    let id = role_id(&app, "user").await;

    let response = app
        .post_form(&format!("/admin/role/delete/{}", id), &[("", "")])
        .await;
    assert_is_redirect_to(&response, "/admin/role/");

    let remaining = sqlx::query_scalar!(
        r#"SELECT COUNT(*) AS "count!" FROM roles_users WHERE role_id = $1"#,
        id
    )
    .fetch_one(&app.db_pool)
    .await
    .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn roles_can_be_created_and_listed() {
    let app = spawn_app().await;
    app.login_as_superuser().await;

    let response = app
        .post_form(
            "/admin/role/new",
            &[("name", "editor"), ("description", "Can edit projects")],
        )
        .await;
    assert_is_redirect_to(&response, "/admin/role/");

    let html = app.get_html("/admin/role/").await;
    assert!(html.contains("editor"));
    assert!(html.contains("Can edit projects"));
}

#[tokio::test]
async fn admin_index_counts_every_table() {
    let app = spawn_app().await;
    app.insert_projects(&[10, 20, 30]).await;
    app.login_as_superuser().await;

    let html = app.get_html("/admin/").await;

    assert!(html.contains(r#"id="user-count">2<"#));
    assert!(html.contains(r#"id="role-count">2<"#));
    assert!(html.contains(r#"id="project-count">3<"#));
}
