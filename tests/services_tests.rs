use cloudpos_client::categories::CategoryEvent;
use cloudpos_client::config::ClientOptions;
use cloudpos_client::models::{NewUser, Product};
use cloudpos_client::products::{NewProduct, ProductEvent};
use cloudpos_client::roles::Role;
use cloudpos_client::sales::{Cart, SaleEvent};
use cloudpos_client::users::UserEvent;
use cloudpos_client::CloudPos;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pos_for(server: &MockServer) -> CloudPos {
    CloudPos::new(ClientOptions::default().with_base_url(&server.uri())).unwrap()
}

async fn next<E>(rx: &mut UnboundedReceiver<E>) -> E {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

#[tokio::test]
async fn test_categories_load_and_create() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/categorias"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "categorias": [{"id": 1, "categoria": "Bebidas"}, {"id": "2", "categoria": "Snacks"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/categorias"))
        .and(body_json(json!({"categoria": "Lácteos"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "Categoría creada"})))
        .mount(&server)
        .await;

    let pos = pos_for(&server);
    let (service, mut rx) = pos.categories();

    assert!(service.load());
    assert_eq!(next(&mut rx).await, CategoryEvent::Busy(true));
    assert_eq!(next(&mut rx).await, CategoryEvent::Busy(false));
    match next(&mut rx).await {
        CategoryEvent::Loaded(items) => {
            assert_eq!(items.len(), 2);
            assert_eq!(items[1].id, 2);
            assert_eq!(items[1].name, "Snacks");
        }
        other => panic!("unexpected event: {:?}", other),
    }

    assert!(service.create("  Lácteos "));
    assert_eq!(next(&mut rx).await, CategoryEvent::Busy(true));
    assert_eq!(next(&mut rx).await, CategoryEvent::Busy(false));
    assert_eq!(
        next(&mut rx).await,
        CategoryEvent::Created("Categoría creada".to_string())
    );
}

#[tokio::test]
async fn test_category_validation_error_is_an_event() {
    let server = MockServer::start().await;
    let pos = pos_for(&server);
    let (service, mut rx) = pos.categories();

    assert!(service.create("   "));
    assert_eq!(next(&mut rx).await, CategoryEvent::Busy(true));
    assert_eq!(next(&mut rx).await, CategoryEvent::Busy(false));
    assert_eq!(
        next(&mut rx).await,
        CategoryEvent::Error("La categoría es obligatoria.".to_string())
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_second_call_while_busy_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/productos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let pos = pos_for(&server);
    let (service, mut rx) = pos.products();

    assert!(service.load());
    assert!(service.is_busy());
    assert!(!service.load());

    assert_eq!(next(&mut rx).await, ProductEvent::Busy(true));
    assert_eq!(next(&mut rx).await, ProductEvent::Busy(false));
    assert_eq!(next(&mut rx).await, ProductEvent::Loaded(Vec::new()));
    assert!(!service.is_busy());
}

#[tokio::test]
async fn test_product_lifecycle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/producto/"))
        .and(body_json(json!({"nombre": "Café", "categoria_id": 2, "precio": 2500, "cantidad": 10})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Producto creado"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/producto/5/"))
        .and(body_json(json!({"precio": 3000, "cantidad": 4})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/producto/5/categoria"))
        .and(body_json(json!({"categoria_id": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"detail": "Categoría cambiada"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/producto/5/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Producto no existe"})))
        .mount(&server)
        .await;

    let pos = pos_for(&server);
    let api = pos.api_client();

    let created = cloudpos_client::products::create_product(api, &NewProduct::new(" Café ", 2, 2500, 10))
        .await
        .unwrap();
    assert_eq!(created, "Producto creado");

    let updated = cloudpos_client::products::update_product(api, 5, 3000, 4)
        .await
        .unwrap();
    assert_eq!(updated, "Producto actualizado");

    let moved = cloudpos_client::products::change_product_category(api, 5, 3)
        .await
        .unwrap();
    assert_eq!(moved, "Categoría cambiada");

    let err = cloudpos_client::products::delete_product(api, 5)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Producto no existe");
}

#[tokio::test]
async fn test_invalid_product_never_reaches_api() {
    let server = MockServer::start().await;
    let pos = pos_for(&server);
    let (service, mut rx) = pos.products();

    assert!(service.create(NewProduct::new("Té", 1, 0, 1)));
    assert_eq!(next(&mut rx).await, ProductEvent::Busy(true));
    assert_eq!(next(&mut rx).await, ProductEvent::Busy(false));
    assert_eq!(
        next(&mut rx).await,
        ProductEvent::Error("El precio debe ser mayor a 0.".to_string())
    );
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_users_list_and_create() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usuarios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "usuario": [
                {"id": 1, "nombre": "ana", "rol": {"id": 1, "nombre": "Administrador"}},
                {"id": 2, "nombre": "luis", "rol": "Bodega"},
                {"id": 3, "nombre": "eva", "rol_id": "2"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/usuario"))
        .and(body_partial_json(json!({
            "nombre": "pedro",
            "contrasena": "5ebe2294ecd0e0f08eab7690d2a6ee69",
            "rol_id": 3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4})))
        .mount(&server)
        .await;

    let pos = pos_for(&server);
    let (service, mut rx) = pos.users();

    assert!(service.list());
    assert_eq!(next(&mut rx).await, UserEvent::Busy(true));
    assert_eq!(next(&mut rx).await, UserEvent::Busy(false));
    match next(&mut rx).await {
        UserEvent::Listed(users) => {
            let roles: Vec<Role> = users.iter().map(|u| u.role()).collect();
            assert_eq!(roles, vec![Role::Administrador, Role::Bodega, Role::Cajero]);
        }
        other => panic!("unexpected event: {:?}", other),
    }

    let user = NewUser {
        name: "pedro".to_string(),
        password: "secret".to_string(),
        role: Role::Bodega,
    };
    assert!(service.create(user));
    assert_eq!(next(&mut rx).await, UserEvent::Busy(true));
    assert_eq!(next(&mut rx).await, UserEvent::Busy(false));
    assert_eq!(
        next(&mut rx).await,
        UserEvent::Created("Usuario creado correctamente.".to_string())
    );
}

#[tokio::test]
async fn test_user_updates() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/usuarios/2/nombre"))
        .and(body_json(json!({"nombre": "Luis"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/usuarios/2/contrasena"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"ok": false})))
        .mount(&server)
        .await;

    let pos = pos_for(&server);
    let api = pos.api_client();

    let renamed = cloudpos_client::users::rename_user(api, 2, "Luis").await.unwrap();
    assert_eq!(renamed, "Nombre actualizado.");

    let err = cloudpos_client::users::change_user_password(api, 2, "nueva")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No se pudo actualizar la contraseña.");
}

#[tokio::test]
async fn test_unexpected_user_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/usuarios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let pos = pos_for(&server);
    let err = cloudpos_client::users::fetch_users(pos.api_client())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Formato de respuesta inesperado.");
}

#[tokio::test]
async fn test_register_sale_from_cart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ventas"))
        .and(body_partial_json(json!({
            "usuario": "ana",
            "total": 5950,
            "items": [{"id_producto": 7, "cantidad": 2, "precio_con_iva": 2975, "subtotal": 5950}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Venta registrada #12"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ListadoVentas"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ventas": [{"id": 12}]})))
        .mount(&server)
        .await;

    let product = Product {
        id: 7,
        name: "Café".to_string(),
        category: None,
        category_id: None,
        price: 2500,
        stock: 3,
    };
    let mut cart = Cart::new();
    cart.add(&product, 2).unwrap();
    assert_eq!(cart.total_label(), "Total: $5.950");

    let pos = pos_for(&server);
    let (service, mut rx) = pos.sales();

    assert!(service.register(cart.to_sale("ana").unwrap()));
    assert_eq!(next(&mut rx).await, SaleEvent::Busy(true));
    assert_eq!(next(&mut rx).await, SaleEvent::Busy(false));
    assert_eq!(
        next(&mut rx).await,
        SaleEvent::Registered("Venta registrada #12".to_string())
    );

    assert!(service.list());
    assert_eq!(next(&mut rx).await, SaleEvent::Busy(true));
    assert_eq!(next(&mut rx).await, SaleEvent::Busy(false));
    assert_eq!(next(&mut rx).await, SaleEvent::Listed(vec![json!({"id": 12})]));
}

#[tokio::test]
async fn test_offline_service_reports_error() {
    let options = ClientOptions::default()
        .with_base_url("http://127.0.0.1:1")
        .with_request_timeout(Duration::from_secs(2));
    let pos = CloudPos::new(options).unwrap();
    let (service, mut rx) = pos.categories();

    assert!(service.load());
    assert_eq!(next(&mut rx).await, CategoryEvent::Busy(true));
    assert_eq!(next(&mut rx).await, CategoryEvent::Busy(false));
    assert!(matches!(next(&mut rx).await, CategoryEvent::Error(_)));
}
