/// Declares the `ConfigValueGroup` of a `groups::<group>` module.
///
/// Each `ref field: Type = default;` entry becomes a public field. `apply_env_overrides` reads
/// `RTC_GYM_<GROUP>_<FIELD>` for every field and keeps the current value when the variable is
/// unset or does not parse.
#[macro_export]
macro_rules! config_group {
    ({
        $(
            $(#[$meta:meta])*
            ref $name:ident : $type:ty = $value:expr;
        )+
    }) => {
        use $crate::ParsableConfigValue as _;

        #[derive(Debug, Clone)]
        pub struct ConfigValueGroup {
            $(
                $(#[$meta])*
                pub $name: $type,
            )+
        }

        impl Default for ConfigValueGroup {
            fn default() -> Self {
                Self {
                    $( $name: $value, )+
                }
            }
        }

        impl ConfigValueGroup {
            pub fn apply_env_overrides(&mut self) {
                $(
                    let var = $crate::env_var_name(module_path!(), stringify!($name));
                    let current = self.$name.clone();
                    self.$name = <$type>::parse(&var, std::env::var(&var).ok(), current);
                )+
            }
        }
    };
}
