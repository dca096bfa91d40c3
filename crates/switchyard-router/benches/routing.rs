//! Routing benchmarks for the prefix-trie router.
//!
//! Run with: cargo bench -p switchyard-router

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use switchyard_router::{Constraints, RouteTable, RouterConfig};

/// Generate a set of realistic API routes.
fn generate_routes(count: usize) -> Vec<(String, String)> {
    let resources = ["users", "orders", "products", "customers", "invoices", "payments"];
    let methods = ["GET", "POST", "PUT", "DELETE"];

    let mut routes = Vec::new();

    for resource in &resources {
        routes.push((format!("/{}", resource), "GET".to_string()));
        routes.push((format!("/{}", resource), "POST".to_string()));
        routes.push((format!("/{}/:id", resource), "GET".to_string()));
        routes.push((format!("/{}/:id", resource), "PUT".to_string()));
        routes.push((format!("/{}/:id", resource), "DELETE".to_string()));
    }

    routes.push(("/users/:userId/orders".to_string(), "GET".to_string()));
    routes.push(("/users/:userId/orders/:orderId".to_string(), "GET".to_string()));
    routes.push(("/assets/*".to_string(), "GET".to_string()));

    while routes.len() < count {
        let i = routes.len();
        let resource = resources[i % resources.len()];
        let method = methods[i % methods.len()];
        routes.push((format!("/api/v{}/{}", i / 10, resource), method.to_string()));
    }

    routes.truncate(count);
    routes
}

fn build_table(routes: &[(String, String)]) -> RouteTable<usize> {
    let mut table = RouteTable::new(RouterConfig::default());
    for (i, (path, method)) in routes.iter().enumerate() {
        table
            .register(method.as_str(), path, Constraints::new(), i)
            .expect("generated routes are unique");
    }
    table
}

/// A single path carrying many version variants.
fn build_versioned_table(versions: usize) -> RouteTable<usize> {
    let mut table = RouteTable::new(RouterConfig::default());
    for i in 0..versions {
        let version = format!("{}.{}.0", i / 10 + 1, i % 10);
        table
            .register("GET", "/users/:id", Constraints::new().with("version", version), i)
            .expect("generated versions are unique");
    }
    table
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_lookup");
    let none = Constraints::new();

    for route_count in [10, 50, 100, 500, 1000] {
        let routes = generate_routes(route_count);
        let table = build_table(&routes);

        group.bench_with_input(BenchmarkId::new("static_path", route_count), &table, |b, table| {
            b.iter(|| black_box(table.resolve("GET", "/users", &none)));
        });

        group.bench_with_input(BenchmarkId::new("param_path", route_count), &table, |b, table| {
            b.iter(|| black_box(table.resolve("GET", "/users/12345", &none)));
        });

        group.bench_with_input(
            BenchmarkId::new("nested_param_path", route_count),
            &table,
            |b, table| {
                b.iter(|| black_box(table.resolve("GET", "/users/12345/orders/67890", &none)));
            },
        );

        group.bench_with_input(BenchmarkId::new("not_found", route_count), &table, |b, table| {
            b.iter(|| black_box(table.resolve("GET", "/nonexistent/path/here", &none)));
        });
    }

    group.finish();
}

fn bench_versioned_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("versioned_lookup");

    for versions in [2, 10, 50] {
        let table = build_versioned_table(versions);
        let exact = Constraints::new().with("version", "1.1.0");
        let range = Constraints::new().with("version", "1.x");

        group.bench_with_input(BenchmarkId::new("exact", versions), &table, |b, table| {
            b.iter(|| black_box(table.resolve("GET", "/users/7", &exact)));
        });

        group.bench_with_input(BenchmarkId::new("range", versions), &table, |b, table| {
            b.iter(|| black_box(table.resolve("GET", "/users/7", &range)));
        });
    }

    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("router_insert");

    for route_count in [10, 50, 100, 500] {
        let routes = generate_routes(route_count);

        group.bench_with_input(BenchmarkId::new("build_table", route_count), &routes, |b, routes| {
            b.iter(|| black_box(build_table(routes)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lookup, bench_versioned_lookup, bench_insert);
criterion_main!(benches);
