use crate::store::{
    ApplicationFilter, CampaignFilter, HubStore, NewApplication, NewCampaign, NewNotification,
    NewProfile, NewRegistration, ProfileFilter, RegistrationFilter,
};
use chrono::{Duration, Utc};
use tempfile::TempDir;
use volink_common::types::ApplicationStatus;

async fn setup() -> (TempDir, HubStore) {
    volink_common::id::init(1, 1);
    let dir = TempDir::new().unwrap();
    let db_url = format!("sqlite://{}/volink-test.db?mode=rwc", dir.path().display());
    let store = HubStore::new(&db_url, dir.path()).await.unwrap();
    (dir, store)
}

async fn make_ngo(store: &HubStore, email: &str, name: &str) -> String {
    store
        .create_profile(&NewProfile {
            email: email.to_string(),
            password_hash: None,
            is_ngo: true,
            full_name: None,
            ngo_name: Some(name.to_string()),
        })
        .await
        .unwrap()
        .id
}

async fn make_volunteer(store: &HubStore, email: &str, name: &str) -> String {
    store
        .create_profile(&NewProfile {
            email: email.to_string(),
            password_hash: None,
            is_ngo: false,
            full_name: Some(name.to_string()),
            ngo_name: None,
        })
        .await
        .unwrap()
        .id
}

fn application_for(campaign_id: &str, volunteer_id: &str) -> NewApplication {
    NewApplication {
        campaign_id: campaign_id.to_string(),
        volunteer_id: volunteer_id.to_string(),
        name: "Ada Volunteer".to_string(),
        email: "ada@example.org".to_string(),
        phone: None,
        interest: Some("I care about this cause".to_string()),
        skills: vec!["Teaching".to_string(), "First Aid".to_string()],
        experience: None,
    }
}

#[tokio::test]
async fn profile_roles_round_trip() {
    let (_dir, store) = setup().await;

    let ngo_id = make_ngo(&store, "org@example.org", "Green Earth").await;
    let vol_id = make_volunteer(&store, "vol@example.org", "Ada").await;

    let ngo = store.get_profile_by_id(&ngo_id).await.unwrap().unwrap();
    assert!(ngo.is_ngo);
    assert_eq!(ngo.display_name(), "Green Earth");

    let vol = store
        .get_profile_by_email("vol@example.org")
        .await
        .unwrap()
        .unwrap();
    assert!(!vol.is_ngo);
    assert_eq!(vol.id, vol_id);
    assert_eq!(vol.display_name(), "Ada");

    let ngos = store
        .list_profiles(
            &ProfileFilter {
                is_ngo_eq: Some(true),
            },
            100,
            0,
        )
        .await
        .unwrap();
    assert_eq!(ngos.len(), 1);
    assert_eq!(
        store
            .count_profiles(&ProfileFilter { is_ngo_eq: None })
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn campaign_defaults_and_ngo_name_backfill() {
    let (_dir, store) = setup().await;
    let ngo_id = make_ngo(&store, "org@example.org", "Green Earth").await;

    let c1 = store
        .insert_campaign(&NewCampaign {
            ngo_id: ngo_id.clone(),
            title: "Beach Cleanup".to_string(),
            description: Some("Help clean the shoreline".to_string()),
            location: Some("Bay Area".to_string()),
            date: Some("2026-09-12".to_string()),
            goal: None,
            category: None,
            image_url: None,
        })
        .await
        .unwrap();
    assert_eq!(c1.category, "Community");

    store
        .insert_campaign(&NewCampaign {
            ngo_id: ngo_id.clone(),
            title: "Tree Planting".to_string(),
            description: None,
            location: None,
            date: None,
            goal: Some("500 trees".to_string()),
            category: Some("Environment".to_string()),
            image_url: None,
        })
        .await
        .unwrap();

    let listed = store
        .list_campaigns_with_ngo_names(&CampaignFilter::default(), 20, 0)
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    // Newest first
    assert_eq!(listed[0].0.title, "Tree Planting");
    assert_eq!(listed[0].1.as_deref(), Some("Green Earth"));

    let env_only = store
        .list_campaigns(
            &CampaignFilter {
                category_eq: Some("Environment".to_string()),
                ngo_id_eq: None,
            },
            20,
            0,
        )
        .await
        .unwrap();
    assert_eq!(env_only.len(), 1);
}

#[tokio::test]
async fn application_duplicate_pre_check() {
    let (_dir, store) = setup().await;
    let ngo_id = make_ngo(&store, "org@example.org", "Green Earth").await;
    let vol_id = make_volunteer(&store, "vol@example.org", "Ada").await;
    let campaign = store
        .insert_campaign(&NewCampaign {
            ngo_id,
            title: "Beach Cleanup".to_string(),
            description: None,
            location: None,
            date: None,
            goal: None,
            category: None,
            image_url: None,
        })
        .await
        .unwrap();

    assert!(!store
        .application_exists(&campaign.id, &vol_id)
        .await
        .unwrap());
    let app = store
        .insert_campaign_application(&application_for(&campaign.id, &vol_id))
        .await
        .unwrap();
    assert_eq!(app.status, ApplicationStatus::Pending);
    assert_eq!(app.skills, vec!["Teaching", "First Aid"]);
    assert!(store
        .application_exists(&campaign.id, &vol_id)
        .await
        .unwrap());

    let mine = store
        .list_applications_by_volunteer(&vol_id, &ApplicationFilter::default())
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn application_status_round_trip_bumps_updated_at() {
    let (_dir, store) = setup().await;
    let ngo_id = make_ngo(&store, "org@example.org", "Green Earth").await;
    let vol_id = make_volunteer(&store, "vol@example.org", "Ada").await;
    let campaign = store
        .insert_campaign(&NewCampaign {
            ngo_id: ngo_id.clone(),
            title: "Beach Cleanup".to_string(),
            description: None,
            location: None,
            date: None,
            goal: None,
            category: None,
            image_url: None,
        })
        .await
        .unwrap();
    let app = store
        .insert_campaign_application(&application_for(&campaign.id, &vol_id))
        .await
        .unwrap();

    store
        .update_application_status(&app.id, ApplicationStatus::Approved)
        .await
        .unwrap()
        .unwrap();
    store
        .update_application_status(&app.id, ApplicationStatus::Pending)
        .await
        .unwrap()
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let last = store
        .update_application_status(&app.id, ApplicationStatus::Rejected)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(last.status, ApplicationStatus::Rejected);
    assert!(last.updated_at > last.created_at);

    // Still exactly one row for the pair
    let campaign_ids = store.list_campaign_ids_by_ngo(&ngo_id).await.unwrap();
    let all = store
        .list_applications_for_campaigns(&campaign_ids, &ApplicationFilter::default(), 100, 0)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    let rejected_only = store
        .list_applications_for_campaigns(
            &campaign_ids,
            &ApplicationFilter {
                status_eq: Some(ApplicationStatus::Rejected),
                campaign_id_eq: None,
            },
            100,
            0,
        )
        .await
        .unwrap();
    assert_eq!(rejected_only.len(), 1);
}

#[tokio::test]
async fn registration_scope_and_status() {
    let (_dir, store) = setup().await;
    let ngo_id = make_ngo(&store, "org@example.org", "Green Earth").await;
    let vol_id = make_volunteer(&store, "vol@example.org", "Ada").await;

    assert!(!store.registration_exists(&ngo_id, &vol_id).await.unwrap());
    let reg = store
        .insert_volunteer_registration(&NewRegistration {
            volunteer_id: vol_id.clone(),
            ngo_id: ngo_id.clone(),
            name: "Ada Volunteer".to_string(),
            email: "vol@example.org".to_string(),
            phone: None,
            interest: None,
            availability: Some("weekends".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(reg.status, ApplicationStatus::Pending);
    assert!(store.registration_exists(&ngo_id, &vol_id).await.unwrap());

    let updated = store
        .update_registration_status(&reg.id, ApplicationStatus::Approved)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, ApplicationStatus::Approved);

    let incoming = store
        .list_registrations_for_ngo(&ngo_id, &RegistrationFilter::default(), 20, 0)
        .await
        .unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(
        store
            .count_registrations_for_ngo(&ngo_id, &RegistrationFilter::default())
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn notification_read_flow_is_idempotent() {
    let (_dir, store) = setup().await;
    let recipient = make_ngo(&store, "org@example.org", "Green Earth").await;

    for i in 0..3 {
        store
            .insert_notification(&NewNotification {
                recipient_id: recipient.clone(),
                sender_id: None,
                notification_type: "application_received".to_string(),
                content: format!("New application #{i}"),
                metadata: None,
            })
            .await
            .unwrap();
    }

    let listed = store
        .list_notifications_for_recipient(&recipient, 20)
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|n| !n.is_read));

    assert!(store
        .mark_notification_read(&listed[0].id, &recipient)
        .await
        .unwrap());
    // Repeat marking is a no-op success
    assert!(store
        .mark_notification_read(&listed[0].id, &recipient)
        .await
        .unwrap());
    // Foreign recipient cannot touch the row
    assert!(!store
        .mark_notification_read(&listed[1].id, "someone-else")
        .await
        .unwrap());

    assert_eq!(
        store.mark_all_notifications_read(&recipient).await.unwrap(),
        2
    );
    let after = store
        .list_notifications_for_recipient(&recipient, 20)
        .await
        .unwrap();
    assert!(after.iter().all(|n| n.is_read));
    // Second sweep has nothing to do
    assert_eq!(
        store.mark_all_notifications_read(&recipient).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn otp_codes_are_replaced_and_single_use() {
    let (_dir, store) = setup().await;
    let now = Utc::now();

    store
        .replace_otp_code("vol@example.org", "111111", now + Duration::minutes(5))
        .await
        .unwrap();
    let second = store
        .replace_otp_code("vol@example.org", "222222", now + Duration::minutes(5))
        .await
        .unwrap();

    // Replacement removed the first code
    let live = store
        .get_live_otp_code("vol@example.org")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(live.id, second.id);
    assert_eq!(live.otp_code, "222222");

    assert!(store.mark_otp_code_used(&live.id).await.unwrap());
    assert!(store
        .get_live_otp_code("vol@example.org")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn expired_otp_codes_are_purged() {
    let (_dir, store) = setup().await;
    let now = Utc::now();

    store
        .replace_otp_code("old@example.org", "111111", now - Duration::minutes(1))
        .await
        .unwrap();
    store
        .replace_otp_code("fresh@example.org", "222222", now + Duration::minutes(5))
        .await
        .unwrap();

    let purged = store.purge_expired_otp_codes(now).await.unwrap();
    assert_eq!(purged, 1);
    assert!(store
        .get_live_otp_code("old@example.org")
        .await
        .unwrap()
        .is_none());
    assert!(store
        .get_live_otp_code("fresh@example.org")
        .await
        .unwrap()
        .is_some());
}
