use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies. The roster behind the server is an in-memory one over the
/// example catalog, with scheduling disabled so that tests drive the cycles.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::model::roster::Roster`, which both refer to the same roster.
#[proc_macro_attribute]
pub fn backend_test(_args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, crate::model::roster::Roster) {
                let roster = crate::test_roster().await;
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::rocket_for_roster(roster.clone()))
                    .await
                    .unwrap();
                (rocket_client, roster)
            }

            /// The test itself.
            #item_fn

            log4rs_test_utils::test_logging::init_logging_once_for(["actor_roster"], None, None);

            // Create an async runtime. Setup and the test share it so that the
            // client's background work keeps running.
            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (rocket_client, roster) = runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let roster_mutex = std::sync::Mutex::new(roster);
            let runtime_mutex = std::sync::Mutex::new(runtime);
            let result = std::panic::catch_unwind(|| {
                let _rocket_client = client_mutex.into_inner().unwrap();
                let _roster = roster_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                runtime.block_on(#new_name(#(#test_args),*));
                runtime.shutdown_background();
            });

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::panic_any(cause);
            }
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_roster = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    // Valid as the last path segment for any type is itself
                    let type_ident = type_path.path.segments.last().map(|s| &s.ident);
                    if type_ident.map_or(false, |i| i == "Client") {
                        if has_client {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                            ));
                        }
                        has_client = true;
                        args.push(quote! { _rocket_client });
                        continue;
                    } else if type_ident.map_or(false, |i| i == "Roster") {
                        if has_roster {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `Roster`",
                            ));
                        }
                        has_roster = true;
                        args.push(quote! { _roster.clone() });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `roster_ident: Roster`",
        ));
    }

    Ok(args)
}
