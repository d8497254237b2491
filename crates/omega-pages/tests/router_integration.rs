//! Integration tests for the channel-based router
//!
//! These tests drive a [`Router`] end to end on a `LocalPool`:
//! 1. Dispatch to the first matching route only
//! 2. History interaction (push, replace, silent, pop state)
//! 3. Handler shapes (callable, loadable, deferred) and failure isolation
//! 4. Lifecycle (start, stop) and the tokio `LocalSet` spawner

use futures::executor::LocalPool;
use omega_pages::router::{HandlerError, HistoryProvider, Load, MemoryHistory, RouteMatch, View};
use omega_pages::{
	Channel, Document, Handler, NavigateOptions, Platform, RoutePattern, Router, RouterError,
	Spawner, StartOptions,
};
use proptest::prelude::*;
use rstest::{fixture, rstest};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

struct Harness {
	pool: LocalPool,
	router: Router,
	history: Rc<MemoryHistory>,
	log: Log,
}

impl Harness {
	fn with_history(history: Rc<MemoryHistory>) -> Self {
		let pool = LocalPool::new();
		let platform = Platform::new(
			Document::new(),
			history.clone(),
			Spawner::from_local(pool.spawner()),
		);
		let router = Router::new(platform).unwrap();
		Self {
			pool,
			router,
			history,
			log: Rc::new(RefCell::new(Vec::new())),
		}
	}

	fn record(&self, label: &'static str) -> Handler {
		let log = Rc::clone(&self.log);
		Handler::callable(move |route| {
			log.borrow_mut()
				.push(format!("{}:{}", label, route.values().join(",")));
			Ok(())
		})
	}

	fn navigate(&mut self, url: &str) {
		self.router.navigate(url, NavigateOptions::default()).unwrap();
		self.pool.run_until_stalled();
	}

	fn log(&self) -> Vec<String> {
		self.log.borrow().clone()
	}
}

#[fixture]
fn harness() -> Harness {
	Harness::with_history(Rc::new(MemoryHistory::default()))
}

#[rstest]
fn test_first_matching_route_receives_captures(mut harness: Harness) {
	let user = harness.record("user");
	let fallback = harness.record("default");
	harness.router.route(":user/:id").unwrap().load(user).unwrap();
	harness.router.default_route().unwrap().load(fallback).unwrap();

	harness.navigate("alice/42");

	assert_eq!(harness.log(), vec!["user:alice,42"]);
	assert_eq!(harness.history.current_path(), "alice/42");
}

#[rstest]
fn test_unmatched_navigation_falls_through_to_default(mut harness: Harness) {
	let inbox = harness.record("inbox");
	let fallback = harness.record("default");
	harness.router.route("inbox/:id").unwrap().load(inbox).unwrap();
	harness.router.default_route().unwrap().load(fallback).unwrap();

	harness.navigate("/outbox");
	harness.navigate("/inbox/3");

	assert_eq!(harness.log(), vec!["default:", "inbox:3"]);
}

#[rstest]
fn test_navigation_without_any_match_is_dropped(mut harness: Harness) {
	let inbox = harness.record("inbox");
	harness.router.route("inbox/:id").unwrap().load(inbox).unwrap();

	harness.navigate("/settings");
	harness.navigate("/inbox/9");

	assert_eq!(harness.log(), vec!["inbox:9"]);
}

#[rstest]
fn test_root_route_matches_only_slash(mut harness: Harness) {
	let root = harness.record("root");
	let fallback = harness.record("default");
	harness.router.root().unwrap().load(root).unwrap();
	harness.router.default_route().unwrap().load(fallback).unwrap();

	harness.navigate("/");
	harness.navigate("/about");

	assert_eq!(harness.log(), vec!["root:", "default:"]);
}

#[rstest]
fn test_custom_expression_route(mut harness: Harness) {
	let archive = harness.record("archive");
	harness
		.router
		.route_regex(regex::Regex::new(r"^/archive/(\d{4})$").unwrap())
		.unwrap()
		.load(archive)
		.unwrap();

	harness.navigate("/archive/2019");
	harness.navigate("/archive/latest");

	assert_eq!(harness.log(), vec!["archive:2019"]);
}

#[rstest]
fn test_start_dispatches_current_location() {
	let mut harness = Harness::with_history(Rc::new(MemoryHistory::new("/inbox/5")));
	let inbox = harness.record("inbox");
	harness.router.route("inbox/:id").unwrap().load(inbox).unwrap();

	harness.router.start(StartOptions::default()).unwrap();
	harness.pool.run_until_stalled();

	assert_eq!(harness.log(), vec!["inbox:5"]);
}

#[rstest]
fn test_silent_start_dispatches_nothing() {
	let mut harness = Harness::with_history(Rc::new(MemoryHistory::new("/inbox/5")));
	let inbox = harness.record("inbox");
	harness.router.route("inbox/:id").unwrap().load(inbox).unwrap();

	harness.router.start(StartOptions::silent()).unwrap();
	harness.pool.run_until_stalled();

	assert!(harness.log().is_empty());
}

#[rstest]
fn test_replace_rewrites_entry_and_still_dispatches(mut harness: Harness) {
	let page = harness.record("page");
	harness.router.route("page/:n").unwrap().load(page).unwrap();

	harness.navigate("/page/1");
	harness
		.router
		.navigate("/page/2", NavigateOptions::default().replace(true))
		.unwrap();
	harness.pool.run_until_stalled();

	assert_eq!(harness.log(), vec!["page:1", "page:2"]);
	assert_eq!(harness.history.len(), 2);
	assert_eq!(harness.history.current_path(), "/page/2");
}

#[rstest]
fn test_silent_navigation_records_history_only(mut harness: Harness) {
	let page = harness.record("page");
	harness.router.route("page/:n").unwrap().load(page).unwrap();

	harness
		.router
		.navigate(
			"/page/7",
			NavigateOptions::default()
				.silent(true)
				.state(json!({"scroll": 120})),
		)
		.unwrap();
	harness.pool.run_until_stalled();

	assert!(harness.log().is_empty());
	let state = harness.history.current_state().unwrap();
	assert_eq!(state.path, "/page/7");
	assert_eq!(state.data, Some(json!({"scroll": 120})));
}

#[rstest]
fn test_pop_state_dispatches_restored_entry(mut harness: Harness) {
	let page = harness.record("page");
	harness.router.route("page/:n").unwrap().load(page).unwrap();

	harness.navigate("/page/1");
	harness.navigate("/page/2");
	harness.history.go_back().unwrap();
	harness.router.handle_pop_state().unwrap();
	harness.pool.run_until_stalled();

	assert_eq!(harness.log(), vec!["page:1", "page:2", "page:1"]);
}

#[rstest]
fn test_failing_handler_does_not_stop_its_consumer(mut harness: Harness) {
	let log = Rc::clone(&harness.log);
	harness
		.router
		.route("item/:id")
		.unwrap()
		.load(Handler::callable(move |route| {
			let id = route.get(0).ok_or(HandlerError::MissingCapture(0))?;
			if id == "bad" {
				return Err(HandlerError::failed("rejected"));
			}
			log.borrow_mut().push(id.to_string());
			Ok(())
		}))
		.unwrap();

	harness.navigate("/item/1");
	harness.navigate("/item/bad");
	harness.navigate("/item/2");

	assert_eq!(harness.log(), vec!["1", "2"]);
}

struct Counter {
	log: Log,
}

impl Load for Counter {
	fn load(&self, route: &RouteMatch) -> Result<(), HandlerError> {
		self.log.borrow_mut().push(format!("load:{}", route.path));
		Ok(())
	}
}

#[rstest]
fn test_loadable_handler(mut harness: Harness) {
	let counter = Counter {
		log: Rc::clone(&harness.log),
	};
	harness
		.router
		.default_route()
		.unwrap()
		.load(Handler::loadable(counter))
		.unwrap();

	harness.navigate("/anything");

	assert_eq!(harness.log(), vec!["load:/anything"]);
}

struct ProfileView {
	title: String,
	log: Log,
	renders: usize,
}

impl View for ProfileView {
	fn render(&mut self, route: &RouteMatch) -> Result<(), HandlerError> {
		self.renders += 1;
		self.log.borrow_mut().push(format!(
			"{}:{}:{}",
			self.title,
			route.values().join(","),
			self.renders
		));
		Ok(())
	}
}

#[rstest]
fn test_deferred_handler_builds_a_view_per_navigation(mut harness: Harness) {
	let log = Rc::clone(&harness.log);
	harness
		.router
		.modules()
		.register("pages/profile", move |options: &serde_json::Value| {
			let title = options["title"].as_str().unwrap_or("untitled").to_string();
			Ok(Box::new(ProfileView {
				title,
				log: Rc::clone(&log),
				renders: 0,
			}) as Box<dyn View>)
		});
	harness
		.router
		.route("profile/:name")
		.unwrap()
		.load(Handler::deferred_with(
			"pages/profile",
			json!({"title": "Profile"}),
		))
		.unwrap();

	harness.navigate("/profile/ada");
	harness.navigate("/profile/grace");

	assert_eq!(harness.log(), vec!["Profile:ada:1", "Profile:grace:1"]);
}

#[rstest]
fn test_deferred_handler_for_unknown_module_is_rejected(harness: Harness) {
	let route = harness.router.route("reports").unwrap();

	let result = route.clone().load(Handler::deferred("pages/reports"));

	assert!(matches!(result, Err(RouterError::InvalidHandler(ref m)) if m == "pages/reports"));
	assert!(!route.is_loaded());
}

#[rstest]
fn test_route_loads_only_once(harness: Harness) {
	let route = harness.router.route("once").unwrap();
	route.clone().load(harness.record("first")).unwrap();

	let second = route.load(harness.record("second"));

	assert!(matches!(second, Err(RouterError::AlreadyLoaded(ref s)) if s == "once"));
}

#[rstest]
fn test_malformed_route_pattern(harness: Harness) {
	let result = harness.router.route("broken(");

	assert!(matches!(result, Err(RouterError::MalformedPattern { .. })));
	assert_eq!(harness.router.route_count(), 0);
}

#[rstest]
fn test_unloaded_route_can_be_drained_by_hand(mut harness: Harness) {
	let route = harness.router.route("jobs/:id").unwrap();
	let received = Rc::new(RefCell::new(Vec::new()));
	let channel = route.channel().clone();
	let sink = Rc::clone(&received);
	harness
		.router
		.platform()
		.spawner()
		.spawn(async move {
			while let Some(matched) = channel.recv().await {
				sink.borrow_mut().push(matched);
			}
		})
		.unwrap();

	harness.navigate("/jobs/17");

	let received = received.borrow();
	assert_eq!(received.len(), 1);
	assert_eq!(received[0].path, "/jobs/17");
	assert_eq!(received[0].get(0), Some("17"));
}

#[rstest]
fn test_stop_closes_channels_and_rejects_navigation(mut harness: Harness) {
	let route = harness.router.route("a").unwrap();
	let page = harness.record("a");
	let route = route.load(page).unwrap();
	harness.navigate("/a");

	harness.router.stop().unwrap();
	harness.pool.run_until_stalled();

	assert!(route.channel().is_closed());
	assert!(harness.router.is_stopped());
	assert!(matches!(harness.router.stop(), Err(RouterError::Stopped)));
	assert!(matches!(
		harness.router.navigate("/a", NavigateOptions::default()),
		Err(RouterError::Stopped)
	));
	assert!(matches!(
		harness.router.start(StartOptions::default()),
		Err(RouterError::Stopped)
	));
	assert!(matches!(harness.router.route("b"), Err(RouterError::Stopped)));
	assert_eq!(harness.log(), vec!["a:"]);
}

#[rstest]
fn test_dropping_router_ends_dispatch_and_consumers(mut harness: Harness) {
	let route = harness
		.router
		.route("a/:id")
		.unwrap()
		.load(harness.record("a"))
		.unwrap();
	harness.navigate("/a/1");

	let Harness {
		mut pool,
		router,
		log,
		..
	} = harness;
	drop(router);
	pool.run_until_stalled();

	assert!(route.channel().is_closed());
	assert_eq!(*log.borrow(), vec!["a:1"]);
	assert!(matches!(
		route.channel().try_send(RoutePattern::any().matches("/a/2").unwrap()),
		Err(omega_pages::ChannelError::Closed)
	));
}

#[rstest]
fn test_consumer_reports_handled_count_when_route_closes() {
	let mut pool = LocalPool::new();
	let channel: Channel<RouteMatch> = Channel::with_capacity(4);
	let handled = Rc::new(RefCell::new(None));
	let handler = Handler::callable(|route| match route.get(0) {
		Some("fail") => Err(HandlerError::failed("nope")),
		_ => Ok(()),
	})
	.resolve(&Default::default())
	.unwrap();
	let consumer = omega_pages::RouteConsumer::new("x/:y", channel.clone(), handler);
	let slot = Rc::clone(&handled);
	Spawner::from_local(pool.spawner())
		.spawn(async move {
			*slot.borrow_mut() = Some(consumer.run().await);
		})
		.unwrap();

	let pattern = RoutePattern::compile("x/:y").unwrap();
	for path in ["/x/1", "/x/fail", "/x/2"] {
		channel.try_send(pattern.matches(path).unwrap()).unwrap();
	}
	channel.close().unwrap();
	pool.run_until_stalled();

	assert_eq!(*handled.borrow(), Some(2));
}

#[tokio::test]
async fn test_router_on_tokio_local_set() {
	let local = tokio::task::LocalSet::new();
	local
		.run_until(async {
			let platform = Platform::in_memory(Spawner::tokio());
			let router = Router::new(platform).unwrap();
			let seen: Channel<String> = Channel::with_capacity(8);
			let sink = seen.clone();
			router
				.route("users/:id")
				.unwrap()
				.load(Handler::callable(move |route| {
					sink.try_send(route.values().join(","))
						.map_err(|e| HandlerError::failed(e.to_string()))
				}))
				.unwrap();

			router
				.navigate("/users/1", NavigateOptions::default())
				.unwrap();
			router
				.navigate("/users/2", NavigateOptions::default())
				.unwrap();

			assert_eq!(seen.recv().await.as_deref(), Some("1"));
			assert_eq!(seen.recv().await.as_deref(), Some("2"));
			router.stop().unwrap();
		})
		.await;
}

const SPECS: [&str; 4] = ["inbox/:id", "inbox/archive", "files/*path", "docs(/:section)"];

fn navigation() -> impl Strategy<Value = String> {
	let segment = "[a-z0-9]{1,6}";
	prop_oneof![
		segment.prop_map(|s| format!("/inbox/{}", s)),
		Just("/inbox/archive".to_string()),
		(segment, segment).prop_map(|(a, b)| format!("/files/{}/{}", a, b)),
		Just("/docs".to_string()),
		segment.prop_map(|s| format!("/docs/{}", s)),
		segment.prop_map(|s| format!("/{}", s)),
	]
}

proptest! {
	#[test]
	fn test_each_navigation_reaches_exactly_the_first_matching_route(
		paths in proptest::collection::vec(navigation(), 1..12)
	) {
		let mut harness = Harness::with_history(Rc::new(MemoryHistory::default()));
		let patterns: Vec<RoutePattern> =
			SPECS.iter().map(|spec| RoutePattern::compile(spec).unwrap()).collect();

		for (index, spec) in SPECS.iter().enumerate() {
			let log = Rc::clone(&harness.log);
			harness
				.router
				.route(spec)
				.unwrap()
				.load(Handler::callable(move |route| {
					log.borrow_mut().push(format!("{}|{}", index, route.path));
					Ok(())
				}))
				.unwrap();
		}
		let log = Rc::clone(&harness.log);
		harness
			.router
			.default_route()
			.unwrap()
			.load(Handler::callable(move |route| {
				log.borrow_mut().push(format!("{}|{}", SPECS.len(), route.path));
				Ok(())
			}))
			.unwrap();

		for path in &paths {
			harness.navigate(path);
		}

		let expected: Vec<String> = paths
			.iter()
			.map(|path| {
				let index = patterns
					.iter()
					.position(|pattern| pattern.is_match(path))
					.unwrap_or(SPECS.len());
				format!("{}|{}", index, path)
			})
			.collect();
		prop_assert_eq!(harness.log(), expected);
	}
}
