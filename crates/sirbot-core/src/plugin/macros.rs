/// Declares a [`PluginDescriptor`](crate::plugin::PluginDescriptor) and adds
/// it to the link-time [`PLUGINS`](crate::plugin::PLUGINS) slice.
///
/// The identifier defaults to the module path of the invocation site, the
/// same string a user would put under `core.plugins`:
///
/// ```rust,ignore
/// // in crate `hello_bot`, module `greeter`
/// register_plugin!(static GREETER => || Box::new(Greeter::default()));
/// // identifier: "hello_bot::greeter"
/// ```
///
/// An explicit identifier can be given instead:
///
/// ```rust,ignore
/// register_plugin!(pub static GREETER = "greeter" => || Box::new(Greeter::default()));
/// ```
#[macro_export]
macro_rules! register_plugin {
    ($vis:vis static $ident:ident = $path:expr => $create:expr $(,)?) => {
        #[$crate::linkme::distributed_slice($crate::plugin::PLUGINS)]
        #[linkme(crate = $crate::linkme)]
        $vis static $ident: $crate::plugin::PluginDescriptor =
            $crate::plugin::PluginDescriptor::new($path, $create);
    };

    ($vis:vis static $ident:ident => $create:expr $(,)?) => {
        $crate::register_plugin!($vis static $ident = ::std::module_path!() => $create);
    };
}
