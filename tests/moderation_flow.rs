/// End-to-end moderation flows over the public library API
use kudos_admin::{
    admin::{
        build_visibility_predicate, Actor, AdminLevel, AdminProfile, Authorizer, MemoryDirectory,
        OwnerScope, RequestedView, ScopeResolver, Target, DENIED_MESSAGE,
    },
    config::{AuthConfig, LoggingConfig, ServerConfig, ServiceConfig, StorageConfig},
    db::{self, users::NewUser},
    media::{DiskMediaBackend, MediaBackend, MediaRef},
    AppContext, KudosError,
};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

struct Org {
    ctx: AppContext,
    site: String,
    eng_admin: String,
    platform_admin: String,
    eng_dev: String,
    mkt_pm: String,
    unscoped_dept_admin: String,
    platform_id: String,
    _dir: TempDir,
}

fn config(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "127.0.0.1".to_string(),
            port: 0,
            version: "test".to_string(),
        },
        storage: StorageConfig {
            data_directory: dir.path().to_path_buf(),
            database: dir.path().join("kudos.sqlite"),
            media_directory: dir.path().join("media"),
        },
        authentication: AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            site_admin_ids: vec!["root".to_string()],
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}

async fn user(ctx: &AppContext, id: &str, email: &str, department_id: Option<&str>) -> String {
    ctx.users
        .create(NewUser {
            id: Some(id.to_string()),
            email: email.to_string(),
            display_name: None,
            department_id: department_id.map(String::from),
        })
        .await
        .unwrap()
        .id
}

async fn org() -> Org {
    let dir = tempfile::tempdir().unwrap();
    let pool = db::memory_pool().await.unwrap();
    let media = Arc::new(DiskMediaBackend::new(dir.path().join("media")));
    let cfg = config(&dir);
    let site_admin_ids = cfg.authentication.site_admin_ids.clone();
    let ctx = AppContext::from_parts(cfg, pool, media);

    let site = user(&ctx, "root", "root@corp.com", None).await;
    assert_eq!(
        assert_ok!(ctx.admin_role_manager.bootstrap_site_admins(&site_admin_ids).await),
        1
    );

    let eng_admin = user(&ctx, "eng-admin", "lead@eng.example.com", None).await;
    assert_ok!(
        ctx.admin_role_manager
            .assign_level(&site, &eng_admin, AdminLevel::Domain, Some("eng.example.com"))
            .await
    );

    let platform = assert_ok!(
        ctx.org_manager
            .create_department(&eng_admin, "eng.example.com", "Platform")
            .await
    );
    let mobile = assert_ok!(
        ctx.org_manager
            .create_department(&eng_admin, "eng.example.com", "Mobile")
            .await
    );

    let platform_admin = user(&ctx, "platform-admin", "mgr@eng.example.com", Some(&platform.id)).await;
    assert_ok!(
        ctx.admin_role_manager
            .assign_level(&eng_admin, &platform_admin, AdminLevel::Department, Some(&platform.id))
            .await
    );

    let eng_dev = user(&ctx, "eng-dev", "dev@eng.example.com", Some(&mobile.id)).await;
    let mkt_pm = user(&ctx, "mkt-pm", "pm@mkt.example.com", None).await;

    let unscoped_dept_admin = user(&ctx, "unscoped", "odd@eng.example.com", Some(&platform.id)).await;
    ctx.users
        .set_admin_level(&unscoped_dept_admin, AdminLevel::Department, None)
        .await
        .unwrap();

    Org {
        ctx,
        site,
        eng_admin,
        platform_admin,
        eng_dev,
        mkt_pm,
        unscoped_dept_admin,
        platform_id: platform.id,
        _dir: dir,
    }
}

async fn visible_ids(org: &Org, viewer_id: &str, view: RequestedView) -> Vec<String> {
    let viewer = org
        .ctx
        .authorizer
        .resolver()
        .actor(viewer_id)
        .await
        .unwrap()
        .unwrap();
    let filter = build_visibility_predicate(&viewer, view);
    let page = org
        .ctx
        .kudos_store
        .list_feed(&viewer, &filter, Some(100), None)
        .await
        .unwrap();
    page.items.into_iter().map(|item| item.kudos.id).collect()
}

#[tokio::test]
async fn domain_admin_moderates_own_domain_only() {
    let org = org().await;
    let store = &org.ctx.kudos_store;
    let moderation = &org.ctx.moderation_manager;

    let eng_post = assert_ok!(store.create(&org.eng_dev, None, "Great refactor", vec![]).await);
    let mkt_post = assert_ok!(store.create(&org.mkt_pm, None, "Great campaign", vec![]).await);

    let record = assert_ok!(moderation.hide(&org.eng_admin, &eng_post.id).await);
    assert_eq!(record.moderated_by, org.eng_admin);

    let err = assert_err!(moderation.hide(&org.eng_admin, &mkt_post.id).await);
    assert!(matches!(err, KudosError::Authorization(ref msg) if msg == DENIED_MESSAGE));

    // The platform department admin cannot touch a post from the mobile department
    assert_err!(moderation.unhide(&org.platform_admin, &eng_post.id).await);
    assert_ok!(moderation.unhide(&org.site, &eng_post.id).await);
}

#[tokio::test]
async fn hidden_posts_are_visible_only_inside_scope() {
    let org = org().await;
    let store = &org.ctx.kudos_store;
    let moderation = &org.ctx.moderation_manager;

    let platform_author = user(&org.ctx, "platform-dev", "ops@eng.example.com", Some(&org.platform_id)).await;
    let platform_post = assert_ok!(store.create(&platform_author, None, "Pager hero", vec![]).await);
    let eng_post = assert_ok!(store.create(&org.eng_dev, None, "App store launch", vec![]).await);
    let mkt_post = assert_ok!(store.create(&org.mkt_pm, None, "Brand refresh", vec![]).await);

    assert_ok!(moderation.hide(&org.site, &platform_post.id).await);
    assert_ok!(moderation.hide(&org.site, &mkt_post.id).await);

    // SITE sees everything
    let site = visible_ids(&org, &org.site, RequestedView::Site).await;
    assert_eq!(site.len(), 3);

    // DOMAIN sees its own hidden posts, never another domain's
    let domain = visible_ids(&org, &org.eng_admin, RequestedView::Site).await;
    assert!(domain.contains(&platform_post.id));
    assert!(domain.contains(&eng_post.id));
    assert!(!domain.contains(&mkt_post.id));

    // DEPARTMENT sees hidden posts of its department
    let department = visible_ids(&org, &org.platform_admin, RequestedView::Site).await;
    assert!(department.contains(&platform_post.id));
    assert!(!department.contains(&mkt_post.id));

    // A USER only sees public posts, whatever view is requested
    for view in [RequestedView::Site, RequestedView::Domain, RequestedView::Department] {
        let ids = visible_ids(&org, &org.eng_dev, view).await;
        assert!(!ids.contains(&platform_post.id));
        assert!(!ids.contains(&mkt_post.id));
    }

    // A department admin with no scope degrades to public posts only
    let unscoped = visible_ids(&org, &org.unscoped_dept_admin, RequestedView::Site).await;
    assert_eq!(unscoped, vec![eng_post.id.clone()]);

    // Narrowing restricts further but never widens
    let narrowed = visible_ids(&org, &org.eng_admin, RequestedView::Department).await;
    assert!(narrowed.is_empty());
}

#[tokio::test]
async fn delete_removes_media_and_reports() {
    let org = org().await;
    let media = &org.ctx.media;

    assert_ok!(media.put("team-photo.jpg", b"jpeg".to_vec()).await);
    let post = assert_ok!(
        org.ctx
            .kudos_store
            .create(
                &org.eng_dev,
                Some(&org.mkt_pm),
                "Thanks for the offsite",
                vec![MediaRef {
                    key: "team-photo.jpg".to_string(),
                    mime_type: "image/jpeg".to_string(),
                }],
            )
            .await
    );

    assert_err!(org.ctx.moderation_manager.delete(&org.mkt_pm, &post.id).await);

    let report = assert_ok!(org.ctx.moderation_manager.delete(&org.eng_admin, &post.id).await);
    assert_eq!(report.media_removed, 1);
    assert!(report.is_complete());
    assert!(!assert_ok!(media.exists("team-photo.jpg").await));
    assert!(assert_ok!(org.ctx.kudos_store.get(&post.id).await).is_none());

    let audit = assert_ok!(org.ctx.admin_role_manager.list_audit_log(&org.site, 50).await);
    assert_eq!(audit[0].action, "kudos.delete");
    assert_eq!(audit[0].subject_id.as_deref(), Some(post.id.as_str()));
}

fn actor(id: &str, level: AdminLevel, scope: Option<&str>, domain: &str) -> Actor {
    Actor {
        id: id.to_string(),
        profile: AdminProfile::new(level, scope),
        domain: Some(domain.to_string()),
        department_id: None,
    }
}

#[tokio::test]
async fn evaluator_scenarios_with_in_memory_directory() {
    let directory = Arc::new(MemoryDirectory::new());
    directory
        .insert_actor(actor("domain-admin", AdminLevel::Domain, Some("eng.example.com"), "eng.example.com"))
        .await;
    directory
        .insert_actor(actor("site-admin", AdminLevel::Site, None, "corp.com"))
        .await;
    directory
        .insert_actor(actor("eng-author", AdminLevel::User, None, "eng.example.com"))
        .await;
    directory
        .insert_actor(actor("mkt-author", AdminLevel::User, None, "mkt.example.com"))
        .await;
    directory.insert_content("eng-post", "eng-author").await;
    directory.insert_content("mkt-post", "mkt-author").await;

    let authorizer = Authorizer::new(ScopeResolver::new(directory.clone()));

    // Scenario A
    let decision = assert_ok!(
        authorizer
            .can_moderate("domain-admin", Some(Target::Content("eng-post".to_string())))
            .await
    );
    assert!(decision.allowed);
    assert_eq!(decision.level, AdminLevel::Domain);
    assert_eq!(decision.scope.as_deref(), Some("eng.example.com"));

    // Scenario B
    let decision = assert_ok!(
        authorizer
            .can_moderate("domain-admin", Some(Target::Content("mkt-post".to_string())))
            .await
    );
    assert!(!decision.allowed);
    assert_eq!(decision.scope.as_deref(), Some("eng.example.com"));

    // Scenario C
    for target in [
        None,
        Some(Target::Content("mkt-post".to_string())),
        Some(Target::Owner(OwnerScope::unknown())),
    ] {
        let decision = assert_ok!(authorizer.can_moderate("site-admin", target).await);
        assert!(decision.allowed);
        assert_eq!(decision.scope.as_deref(), Some("site"));
    }

    // Lookup faults surface as errors, never as a grant
    directory.set_unavailable(true);
    assert_err!(
        authorizer
            .can_moderate("domain-admin", Some(Target::Content("eng-post".to_string())))
            .await
    );
}
