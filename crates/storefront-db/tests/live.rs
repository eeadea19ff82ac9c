//! Live integration tests for storefront-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/storefront-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use storefront_core::{Color, QueryError, QueryFeatures};
use storefront_db::{
    add_to_cart, add_to_wishlist, apply_coupon, clear_cart, create_address, create_coupon,
    create_product, create_review, create_subcategory, create_taxonomy, deactivate_coupon,
    delete_address, delete_product, delete_review, delete_subcategory, delete_taxonomy,
    find_page, get_cart, get_product, get_subcategory, get_wishlist, list_addresses,
    purge_catalog, remove_cart_item, remove_from_wishlist, run_migrations, seed_catalog,
    update_cart_item_quantity, update_product, update_review, Collection, DbError, NewAddress,
    NewCartItem, NewCoupon, NewProduct, ProductPatch, Taxonomy,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}

async fn insert_test_category(pool: &sqlx::PgPool, name: &str) -> Uuid {
    create_taxonomy(pool, Taxonomy::Category, name, None)
        .await
        .unwrap_or_else(|e| panic!("create category '{name}' failed: {e}"))
        .id
}

async fn insert_test_product(pool: &sqlx::PgPool, category_id: Uuid, name: &str, price: &str) -> Uuid {
    create_product(
        pool,
        &NewProduct {
            name: name.to_string(),
            description: format!("{name} description"),
            quantity: 10,
            price: dec(price),
            price_after_discount: None,
            colors: vec!["BLACK".to_string(), "WHITE".to_string()],
            image_cover: format!("https://cdn.example.com/{name}.png"),
            images: vec![],
            category_id,
            brand_id: None,
            subcategory_id: None,
        },
    )
    .await
    .unwrap_or_else(|e| panic!("create product '{name}' failed: {e}"))
    .id
}

async fn insert_test_coupon(pool: &sqlx::PgPool, name: &str, discount: i32, expire_in: Duration) {
    create_coupon(
        pool,
        &NewCoupon {
            name: name.to_string(),
            discount,
            expire: Utc::now() + expire_in,
        },
    )
    .await
    .unwrap_or_else(|e| panic!("create coupon '{name}' failed: {e}"));
}

fn item(product_id: Uuid, color: Color, quantity: i32) -> NewCartItem {
    NewCartItem {
        product_id,
        color,
        quantity,
    }
}

fn features(query: &[(&str, &str)]) -> QueryFeatures {
    QueryFeatures::parse(query.iter().copied(), 50)
}

// ---------------------------------------------------------------------------
// Section 1: Cart pricing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn add_to_cart_creates_cart_and_totals(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "19.99").await;
    let case = insert_test_product(&pool, category, "case", "5.01").await;
    let user = Uuid::new_v4();

    add_to_cart(&pool, user, item(phone, Color::Black, 2))
        .await
        .expect("first add failed");
    let view = add_to_cart(&pool, user, item(case, Color::White, 3))
        .await
        .expect("second add failed");

    assert_eq!(view.cart.user_id, user);
    assert_eq!(view.num_of_cart_items, 2);
    assert_eq!(view.cart.total_cart_price, dec("55.01"));
    assert!(view.cart.total_price_after_discount.is_none());
    // Newest line first.
    assert_eq!(view.items[0].product_id, case);
    assert_eq!(view.items[0].product_name, "case");
}

#[sqlx::test(migrations = "../../migrations")]
async fn adding_same_product_and_color_increments_quantity(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "10.00").await;
    let user = Uuid::new_v4();

    add_to_cart(&pool, user, item(phone, Color::Black, 2))
        .await
        .expect("first add failed");
    let view = add_to_cart(&pool, user, item(phone, Color::Black, 3))
        .await
        .expect("second add failed");

    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 5);
    assert_eq!(view.cart.total_cart_price, dec("50.00"));

    let view = add_to_cart(&pool, user, item(phone, Color::White, 1))
        .await
        .expect("different color add failed");
    assert_eq!(view.items.len(), 2, "a different color is a separate line");
}

#[sqlx::test(migrations = "../../migrations")]
async fn cart_line_keeps_snapshotted_price(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "10.00").await;
    let user = Uuid::new_v4();

    add_to_cart(&pool, user, item(phone, Color::Black, 1))
        .await
        .expect("add failed");
    sqlx::query("UPDATE products SET price = 99.00 WHERE id = $1")
        .bind(phone)
        .execute(&pool)
        .await
        .expect("price change failed");

    let view = add_to_cart(&pool, user, item(phone, Color::Black, 1))
        .await
        .expect("re-add failed");
    assert_eq!(view.items[0].price, dec("10.00"));
    assert_eq!(view.cart.total_cart_price, dec("20.00"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn add_to_cart_unknown_product_is_not_found(pool: sqlx::PgPool) {
    let err = add_to_cart(&pool, Uuid::new_v4(), item(Uuid::new_v4(), Color::Black, 1))
        .await
        .expect_err("unknown product should fail");
    assert!(matches!(err, DbError::NotFound), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn totals_track_update_and_remove(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "12.50").await;
    let case = insert_test_product(&pool, category, "case", "3.00").await;
    let user = Uuid::new_v4();

    add_to_cart(&pool, user, item(phone, Color::Black, 1))
        .await
        .expect("add phone failed");
    let view = add_to_cart(&pool, user, item(case, Color::Black, 1))
        .await
        .expect("add case failed");
    let phone_line = view
        .items
        .iter()
        .find(|i| i.product_id == phone)
        .expect("phone line")
        .id;
    let case_line = view
        .items
        .iter()
        .find(|i| i.product_id == case)
        .expect("case line")
        .id;

    let view = update_cart_item_quantity(&pool, user, phone_line, 4)
        .await
        .expect("update failed");
    assert_eq!(view.cart.total_cart_price, dec("53.00"));

    let view = remove_cart_item(&pool, user, case_line)
        .await
        .expect("remove failed");
    assert_eq!(view.num_of_cart_items, 1);
    assert_eq!(view.cart.total_cart_price, dec("50.00"));

    let view = remove_cart_item(&pool, user, phone_line)
        .await
        .expect("remove last failed");
    assert!(view.items.is_empty());
    assert_eq!(view.cart.total_cart_price, Decimal::ZERO);
}

#[sqlx::test(migrations = "../../migrations")]
async fn item_of_another_users_cart_is_not_found(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "10.00").await;
    let owner = Uuid::new_v4();
    let intruder = Uuid::new_v4();

    let view = add_to_cart(&pool, owner, item(phone, Color::Black, 1))
        .await
        .expect("owner add failed");
    add_to_cart(&pool, intruder, item(phone, Color::White, 1))
        .await
        .expect("intruder add failed");

    let err = update_cart_item_quantity(&pool, intruder, view.items[0].id, 9)
        .await
        .expect_err("foreign item update should fail");
    assert!(matches!(err, DbError::NotFound));

    let err = remove_cart_item(&pool, Uuid::new_v4(), view.items[0].id)
        .await
        .expect_err("user without cart should fail");
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn coupon_discount_applies_then_clears_on_mutation(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "50.00").await;
    let case = insert_test_product(&pool, category, "case", "1.00").await;
    insert_test_coupon(&pool, "SAVE20", 20, Duration::days(7)).await;
    let user = Uuid::new_v4();

    add_to_cart(&pool, user, item(phone, Color::Black, 2))
        .await
        .expect("add failed");
    let view = apply_coupon(&pool, user, "SAVE20")
        .await
        .expect("apply coupon failed");
    assert_eq!(view.cart.total_cart_price, dec("100.00"));
    assert_eq!(view.cart.total_price_after_discount, Some(dec("80.00")));

    let view = add_to_cart(&pool, user, item(case, Color::Black, 1))
        .await
        .expect("add after coupon failed");
    let case_line = view.items[0].id;
    let view = remove_cart_item(&pool, user, case_line)
        .await
        .expect("remove failed");
    assert_eq!(view.cart.total_cart_price, dec("100.00"));
    assert!(view.cart.total_price_after_discount.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn rejected_coupon_keeps_existing_discount(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "50.00").await;
    insert_test_coupon(&pool, "SAVE20", 20, Duration::days(7)).await;
    insert_test_coupon(&pool, "OLD", 50, -Duration::days(1)).await;
    insert_test_coupon(&pool, "GONE", 50, Duration::days(1)).await;
    let user = Uuid::new_v4();

    let gone_id: Uuid = sqlx::query_scalar("SELECT id FROM coupons WHERE name = 'GONE'")
        .fetch_one(&pool)
        .await
        .expect("coupon id");
    assert!(deactivate_coupon(&pool, gone_id).await.expect("deactivate"));

    add_to_cart(&pool, user, item(phone, Color::Black, 2))
        .await
        .expect("add failed");
    let discounted = apply_coupon(&pool, user, "SAVE20")
        .await
        .expect("valid coupon failed");
    assert_eq!(discounted.cart.total_price_after_discount, Some(dec("80.00")));

    for code in ["OLD", "GONE", "NOPE"] {
        let err = apply_coupon(&pool, user, code)
            .await
            .expect_err("invalid coupon should fail");
        assert!(matches!(err, DbError::InvalidOrExpiredCoupon), "{code}: {err:?}");

        let after = get_cart(&pool, user).await.expect("get cart failed");
        assert_eq!(after.cart.total_cart_price, dec("100.00"), "{code}");
        assert_eq!(
            after.cart.total_price_after_discount,
            Some(dec("80.00")),
            "{code} must not clear the applied discount"
        );
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn apply_coupon_without_cart_is_not_found(pool: sqlx::PgPool) {
    insert_test_coupon(&pool, "SAVE10", 10, Duration::days(1)).await;
    let err = apply_coupon(&pool, Uuid::new_v4(), "SAVE10")
        .await
        .expect_err("no cart should fail");
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn clear_cart_removes_cart_and_items(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "10.00").await;
    let user = Uuid::new_v4();

    add_to_cart(&pool, user, item(phone, Color::Black, 1))
        .await
        .expect("add failed");
    clear_cart(&pool, user).await.expect("clear failed");

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(remaining, 0);
    assert!(matches!(get_cart(&pool, user).await, Err(DbError::NotFound)));
    assert!(matches!(clear_cart(&pool, user).await, Err(DbError::NotFound)));
}

// ---------------------------------------------------------------------------
// Section 2: Generic list queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_filters_by_price_range(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    for (name, price) in [("a", "5.00"), ("b", "10.00"), ("c", "30.00"), ("d", "50.00"), ("e", "80.00")] {
        insert_test_product(&pool, category, name, price).await;
    }

    let page = find_page(
        &pool,
        Collection::Products,
        &features(&[("price[gte]", "10"), ("price[lte]", "50"), ("sort", "price")]),
    )
    .await
    .expect("find_page failed");

    assert_eq!(page.total, 3);
    let prices: Vec<&str> = page
        .results
        .iter()
        .map(|r| r["price"].as_str().expect("price string"))
        .collect();
    assert_eq!(prices, vec!["10.00", "30.00", "50.00"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_paginates_after_counting(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    for i in 0..25 {
        insert_test_product(&pool, category, &format!("p{i:02}"), "1.00").await;
    }

    let page = find_page(
        &pool,
        Collection::Products,
        &features(&[("page", "2"), ("limit", "10"), ("sort", "name")]),
    )
    .await
    .expect("find_page failed");

    assert_eq!(page.total, 25);
    assert_eq!(page.results.len(), 10);
    assert_eq!(page.results[0]["name"], "p10");
    assert_eq!(page.pagination.current_page, 2);
    assert_eq!(page.pagination.number_of_pages, 3);
    assert_eq!(page.pagination.next, Some(3));
    assert_eq!(page.pagination.prev, Some(1));
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_projects_requested_fields_and_searches(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    insert_test_product(&pool, category, "Galaxy Phone", "1.00").await;
    insert_test_product(&pool, category, "Charger", "1.00").await;

    let page = find_page(
        &pool,
        Collection::Products,
        &features(&[("keyword", "galaxy"), ("fields", "name,price")]),
    )
    .await
    .expect("find_page failed");

    assert_eq!(page.total, 1);
    let row = page.results[0].as_object().expect("object row");
    assert_eq!(row.len(), 2);
    assert_eq!(row["name"], "Galaxy Phone");
}

fn names(page: &storefront_db::Page) -> Vec<&str> {
    page.results
        .iter()
        .map(|r| r["name"].as_str().expect("name string"))
        .collect()
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_sorts_by_multiple_keys(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    for (name, price) in [("bravo", "20.00"), ("alpha", "20.00"), ("charlie", "10.00"), ("delta", "30.00")] {
        insert_test_product(&pool, category, name, price).await;
    }

    let page = find_page(&pool, Collection::Products, &features(&[("sort", "-price,name")]))
        .await
        .expect("find_page failed");

    assert_eq!(names(&page), vec!["delta", "alpha", "bravo", "charlie"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_defaults_to_newest_first(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    for (name, days_ago) in [("old", 3), ("newest", 0), ("middle", 1)] {
        let id = insert_test_product(&pool, category, name, "1.00").await;
        sqlx::query("UPDATE products SET created_at = NOW() - make_interval(days => $2) WHERE id = $1")
            .bind(id)
            .bind(days_ago)
            .execute(&pool)
            .await
            .expect("backdate failed");
    }

    let page = find_page(&pool, Collection::Products, &features(&[]))
        .await
        .expect("find_page failed");

    assert_eq!(names(&page), vec!["newest", "middle", "old"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_combines_keyword_with_filters(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    insert_test_product(&pool, category, "Galaxy Phone", "10.00").await;
    insert_test_product(&pool, category, "Galaxy Tab", "50.00").await;
    insert_test_product(&pool, category, "Pixel", "10.00").await;

    let page = find_page(
        &pool,
        Collection::Products,
        &features(&[("keyword", "galaxy"), ("price[lt]", "20")]),
    )
    .await
    .expect("find_page failed");

    assert_eq!(page.total, 1);
    assert_eq!(names(&page), vec!["Galaxy Phone"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_keyword_matches_description(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let rugged = insert_test_product(&pool, category, "Rugged", "1.00").await;
    insert_test_product(&pool, category, "Slim", "1.00").await;
    sqlx::query("UPDATE products SET description = 'Waterproof shell' WHERE id = $1")
        .bind(rugged)
        .execute(&pool)
        .await
        .expect("description update failed");

    let page = find_page(&pool, Collection::Products, &features(&[("keyword", "WATERPROOF")]))
        .await
        .expect("find_page failed");

    assert_eq!(page.total, 1);
    assert_eq!(names(&page), vec!["Rugged"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_keyword_is_literal(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    insert_test_product(&pool, category, "100% cotton case", "1.00").await;
    insert_test_product(&pool, category, "1000 mAh battery", "1.00").await;

    let page = find_page(&pool, Collection::Products, &features(&[("keyword", "100%")]))
        .await
        .expect("find_page failed");
    assert_eq!(page.total, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_filters_array_membership_and_in(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let first = insert_test_product(&pool, category, "first", "1.00").await;
    insert_test_product(&pool, category, "second", "2.00").await;

    let page = find_page(&pool, Collection::Products, &features(&[("colors", "BLACK")]))
        .await
        .expect("find_page failed");
    assert_eq!(page.total, 2);

    let page = find_page(
        &pool,
        Collection::Products,
        &features(&[("id[in]", &format!("{first},{}", Uuid::new_v4()))]),
    )
    .await
    .expect("find_page failed");
    assert_eq!(page.total, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_rejects_unknown_field(pool: sqlx::PgPool) {
    let err = find_page(&pool, Collection::Brands, &features(&[("password", "x")]))
        .await
        .expect_err("unknown field should fail");
    assert!(matches!(
        err,
        DbError::Query(QueryError::UnknownField(ref field)) if field == "password"
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_bad_cast_is_invalid_input(pool: sqlx::PgPool) {
    let err = find_page(&pool, Collection::Products, &features(&[("price[gt]", "cheap")]))
        .await
        .expect_err("uncastable value should fail");
    assert!(err.is_invalid_input(), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn find_page_hides_deactivated_coupons(pool: sqlx::PgPool) {
    insert_test_coupon(&pool, "KEEP", 10, Duration::days(1)).await;
    insert_test_coupon(&pool, "DROP", 10, Duration::days(1)).await;
    let drop_id: Uuid = sqlx::query_scalar("SELECT id FROM coupons WHERE name = 'DROP'")
        .fetch_one(&pool)
        .await
        .expect("coupon id");
    deactivate_coupon(&pool, drop_id).await.expect("deactivate");

    let page = find_page(&pool, Collection::Coupons, &features(&[]))
        .await
        .expect("find_page failed");
    assert_eq!(page.total, 1);
    assert_eq!(page.results[0]["name"], "KEEP");
}

// ---------------------------------------------------------------------------
// Section 3: Catalog, reviews, seeding
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_category_name_is_unique_violation(pool: sqlx::PgPool) {
    insert_test_category(&pool, "Phones").await;
    let err = create_taxonomy(&pool, Taxonomy::Category, "Phones", None)
        .await
        .expect_err("duplicate should fail");
    assert!(err.is_unique_violation(), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_category_with_products_is_restricted(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    insert_test_product(&pool, category, "phone", "1.00").await;

    let err = delete_taxonomy(&pool, Taxonomy::Category, category)
        .await
        .expect_err("restricted delete should fail");
    assert!(err.is_foreign_key_violation(), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn product_patch_keeps_absent_fields_and_delete_cascades(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "10.00").await;
    let user = Uuid::new_v4();
    add_to_cart(&pool, user, item(phone, Color::Black, 1))
        .await
        .expect("add failed");

    let patched = update_product(
        &pool,
        phone,
        &ProductPatch {
            price: Some(dec("12.50")),
            colors: Some(vec!["GOLD".to_string()]),
            ..ProductPatch::default()
        },
    )
    .await
    .expect("update failed")
    .expect("product exists");
    assert_eq!(patched.price, dec("12.50"));
    assert_eq!(patched.colors, vec!["GOLD".to_string()]);
    assert_eq!(patched.name, "phone");
    assert_eq!(patched.quantity, 10);

    assert!(update_product(&pool, Uuid::new_v4(), &ProductPatch::default())
        .await
        .expect("update failed")
        .is_none());

    assert!(delete_product(&pool, phone).await.expect("delete failed"));
    assert!(!delete_product(&pool, phone).await.expect("delete failed"));
    assert!(get_product(&pool, phone).await.expect("get failed").is_none());

    let cart = get_cart(&pool, user).await.expect("cart survives");
    assert!(cart.items.is_empty(), "cart lines cascade with the product");
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_product_recomputes_holding_carts(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "40.00").await;
    let case = insert_test_product(&pool, category, "case", "10.00").await;
    let holder = Uuid::new_v4();
    let bystander = Uuid::new_v4();

    add_to_cart(&pool, holder, item(phone, Color::Black, 1))
        .await
        .expect("add phone failed");
    let view = add_to_cart(&pool, holder, item(case, Color::Black, 1))
        .await
        .expect("add case failed");
    assert_eq!(view.cart.total_cart_price, dec("50.00"));
    add_to_cart(&pool, bystander, item(case, Color::White, 2))
        .await
        .expect("bystander add failed");

    assert!(delete_product(&pool, phone).await.expect("delete failed"));

    let cart = get_cart(&pool, holder).await.expect("cart survives");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.cart.total_cart_price, dec("10.00"));
    let other = get_cart(&pool, bystander).await.expect("cart survives");
    assert_eq!(other.cart.total_cart_price, dec("20.00"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn purge_zeroes_totals_of_affected_carts(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "40.00").await;
    insert_test_coupon(&pool, "SAVE20", 20, Duration::days(7)).await;
    let user = Uuid::new_v4();

    add_to_cart(&pool, user, item(phone, Color::Black, 2))
        .await
        .expect("add failed");
    apply_coupon(&pool, user, "SAVE20").await.expect("apply failed");

    purge_catalog(&pool).await.expect("purge failed");

    let cart = get_cart(&pool, user).await.expect("cart survives a purge");
    assert!(cart.items.is_empty());
    assert_eq!(cart.cart.total_cart_price, Decimal::ZERO);
    assert!(cart.cart.total_price_after_discount.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn reviews_maintain_product_ratings(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "1.00").await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let review = create_review(&pool, alice, phone, Some("Great"), 5)
        .await
        .expect("first review failed");
    create_review(&pool, bob, phone, None, 2)
        .await
        .expect("second review failed");

    let product = get_product(&pool, phone).await.expect("get").expect("exists");
    assert_eq!(product.ratings_quantity, 2);
    assert_eq!(product.ratings_average, dec("3.50"));

    let err = create_review(&pool, alice, phone, None, 1)
        .await
        .expect_err("second review by same user should fail");
    assert!(err.is_unique_violation());

    assert!(update_review(&pool, review.id, bob, None, Some(1))
        .await
        .expect("update")
        .is_none());
    update_review(&pool, review.id, alice, None, Some(4))
        .await
        .expect("update")
        .expect("owned review");
    let product = get_product(&pool, phone).await.expect("get").expect("exists");
    assert_eq!(product.ratings_average, dec("3.00"));

    assert!(delete_review(&pool, review.id, alice).await.expect("delete"));
    let product = get_product(&pool, phone).await.expect("get").expect("exists");
    assert_eq!(product.ratings_quantity, 1);
    assert_eq!(product.ratings_average, dec("2.00"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn review_of_missing_product_is_not_found(pool: sqlx::PgPool) {
    let err = create_review(&pool, Uuid::new_v4(), Uuid::new_v4(), None, 3)
        .await
        .expect_err("missing product should fail");
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn subcategory_delete_detaches_products(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "1.00").await;

    let err = create_subcategory(&pool, Uuid::new_v4(), "Orphan", None)
        .await
        .expect_err("missing category should fail");
    assert!(matches!(err, DbError::NotFound), "got {err:?}");

    let android = create_subcategory(&pool, category, "Android", None)
        .await
        .expect("create subcategory failed");
    let patched = update_product(
        &pool,
        phone,
        &ProductPatch {
            subcategory_id: Some(android.id),
            ..ProductPatch::default()
        },
    )
    .await
    .expect("update failed")
    .expect("product exists");
    assert_eq!(patched.subcategory_id, Some(android.id));

    let page = find_page(
        &pool,
        Collection::Products,
        &features(&[("subcategory_id", &android.id.to_string())]),
    )
    .await
    .expect("find_page failed");
    assert_eq!(page.total, 1);

    assert!(delete_subcategory(&pool, android.id).await.expect("delete failed"));
    let product = get_product(&pool, phone).await.expect("get").expect("exists");
    assert!(product.subcategory_id.is_none());
    assert!(get_subcategory(&pool, android.id).await.expect("get").is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn wishlist_lists_newest_first_and_follows_product_deletes(pool: sqlx::PgPool) {
    let category = insert_test_category(&pool, "Phones").await;
    let phone = insert_test_product(&pool, category, "phone", "40.00").await;
    let case = insert_test_product(&pool, category, "case", "10.00").await;
    let user = Uuid::new_v4();

    add_to_wishlist(&pool, user, phone).await.expect("add phone");
    add_to_wishlist(&pool, user, case).await.expect("add case");
    sqlx::query("UPDATE wishlists SET created_at = NOW() - INTERVAL '1 day' WHERE product_id = $1")
        .bind(phone)
        .execute(&pool)
        .await
        .expect("backdate failed");

    let err = add_to_wishlist(&pool, user, phone)
        .await
        .expect_err("duplicate should fail");
    assert!(err.is_unique_violation(), "got {err:?}");
    let err = add_to_wishlist(&pool, user, Uuid::new_v4())
        .await
        .expect_err("missing product should fail");
    assert!(matches!(err, DbError::NotFound), "got {err:?}");

    let view = get_wishlist(&pool, user).await.expect("get wishlist");
    assert_eq!(view.count, 2);
    assert_eq!(view.items[0].product_id, case);
    assert_eq!(view.items[1].product_price, dec("40.00"));

    assert!(delete_product(&pool, phone).await.expect("delete failed"));
    assert!(remove_from_wishlist(&pool, user, case).await.expect("remove"));
    assert!(!remove_from_wishlist(&pool, user, case).await.expect("remove"));
    assert_eq!(get_wishlist(&pool, user).await.expect("get wishlist").count, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn address_delete_checks_owner(pool: sqlx::PgPool) {
    let owner = Uuid::new_v4();
    let address = create_address(
        &pool,
        owner,
        &NewAddress {
            alias: "Home".to_string(),
            details: "12 Harbour Street".to_string(),
            phone: "+441234567890".to_string(),
            city: "Leeds".to_string(),
            postal_code: None,
        },
    )
    .await
    .expect("create address failed");

    let err = delete_address(&pool, Uuid::new_v4(), address.id)
        .await
        .expect_err("stranger delete should fail");
    assert!(matches!(err, DbError::Forbidden), "got {err:?}");
    let err = delete_address(&pool, owner, Uuid::new_v4())
        .await
        .expect_err("missing address should fail");
    assert!(matches!(err, DbError::NotFound), "got {err:?}");

    assert_eq!(list_addresses(&pool, owner).await.expect("list").len(), 1);
    delete_address(&pool, owner, address.id).await.expect("owner delete");
    assert!(list_addresses(&pool, owner).await.expect("list").is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_is_idempotent_and_purge_empties_catalog(pool: sqlx::PgPool) {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/catalog.yaml");
    let catalog = storefront_core::load_catalog(&path).expect("catalog.yaml should load");

    let first = seed_catalog(&pool, &catalog).await.expect("first seed failed");
    let second = seed_catalog(&pool, &catalog).await.expect("second seed failed");
    assert_eq!(first, second);

    let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(u64::try_from(products).expect("non-negative"), first.products);

    let purged = purge_catalog(&pool).await.expect("purge failed");
    assert_eq!(purged.products, first.products);
    assert_eq!(purged.categories, first.categories);

    let coupons: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupons")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(coupons, 1, "coupons survive a purge");
}

// ---------------------------------------------------------------------------
// Section 4: Migrations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn run_migrations_on_migrated_database_applies_nothing(pool: sqlx::PgPool) {
    let applied = run_migrations(&pool).await.expect("migrate failed");
    assert_eq!(applied, 0);
}

#[sqlx::test(migrations = false)]
async fn run_migrations_on_fresh_database_applies_every_file(pool: sqlx::PgPool) {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let files = std::fs::read_dir(&dir)
        .expect("migrations dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
        .count();

    let applied = run_migrations(&pool).await.expect("first migrate failed");
    assert_eq!(applied, files);
    assert!(applied > 0);

    let again = run_migrations(&pool).await.expect("second migrate failed");
    assert_eq!(again, 0);
}
